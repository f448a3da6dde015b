use std::fmt;

use serde::{Serialize, Serializer};
use tessera_measurement::Timestamp;

macro_rules! define_item_types {
    ($($variant:ident => $ty:ty, $name:literal;)+) => {
        /// The type of the items stored in a column.
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub enum ItemType {
            $(
                #[doc = concat!("`", $name, "` items.")]
                $variant,
            )+
        }

        impl ItemType {
            /// Every item type, in declaration order.
            pub const ALL: &'static [ItemType] = &[$(ItemType::$variant,)+];

            /// Returns the canonical name of this item type.
            pub fn name(&self) -> &'static str {
                match self {
                    $(ItemType::$variant => $name,)+
                }
            }
        }

        /// A single, non-null column value.
        #[derive(Clone, Debug, PartialEq)]
        pub enum Cell {
            $(
                #[doc = concat!("A `", $name, "` value.")]
                $variant($ty),
            )+
        }

        impl Cell {
            /// Returns the item type of this value.
            pub fn item_type(&self) -> ItemType {
                match self {
                    $(Cell::$variant(_) => ItemType::$variant,)+
                }
            }
        }

        /// The values of a column, stored as a typed vector of nullable items.
        ///
        /// Serializes as a plain sequence, with nulls as `null`. Non-finite floating-point values are serialized as
        /// the strings `"NaN"`, `"+Inf"`, and `"-Inf"`, so they never read back as holes.
        #[derive(Clone, Debug, PartialEq)]
        pub enum ColumnValues {
            $(
                #[doc = concat!("`", $name, "` values.")]
                $variant(Vec<Option<$ty>>),
            )+
        }

        impl ColumnValues {
            /// Creates an empty vector of the given item type.
            pub fn empty(item_type: ItemType) -> Self {
                match item_type {
                    $(ItemType::$variant => ColumnValues::$variant(Vec::new()),)+
                }
            }

            /// Returns the item type of these values.
            pub fn item_type(&self) -> ItemType {
                match self {
                    $(ColumnValues::$variant(_) => ItemType::$variant,)+
                }
            }

            /// Returns the number of rows, null or not.
            pub fn len(&self) -> usize {
                match self {
                    $(ColumnValues::$variant(values) => values.len(),)+
                }
            }

            /// Returns `true` if there are no rows.
            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Returns the value at the given row, or `None` if the row is null or out of bounds.
            pub fn get(&self, row: usize) -> Option<Cell> {
                match self {
                    $(ColumnValues::$variant(values) => values.get(row).cloned().flatten().map(Cell::$variant),)+
                }
            }

            /// Returns `true` if the given row exists and holds a null.
            pub fn is_null(&self, row: usize) -> bool {
                match self {
                    $(ColumnValues::$variant(values) => matches!(values.get(row), Some(None)),)+
                }
            }

            /// Grows the vector with nulls until it holds `len` rows. Never shrinks.
            pub(crate) fn pad_to(&mut self, len: usize) {
                if self.len() >= len {
                    return;
                }

                match self {
                    $(ColumnValues::$variant(values) => values.resize(len, None),)+
                }
            }

            /// Stores a value at the given row, padding with nulls as needed.
            ///
            /// Returns `true` if a non-null value was already present at that row and got replaced.
            ///
            /// The cell must be of this column's item type; coercion guarantees as much before anything reaches a
            /// column.
            pub(crate) fn set(&mut self, row: usize, cell: Cell) -> bool {
                self.pad_to(row + 1);

                match (self, cell) {
                    $((ColumnValues::$variant(values), Cell::$variant(value)) => values[row].replace(value).is_some(),)+
                    (values, cell) => unreachable!(
                        "coerced {} value stored into {} column",
                        cell.item_type(),
                        values.item_type()
                    ),
                }
            }
        }

        impl Serialize for ColumnValues {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                match self {
                    $(ColumnValues::$variant(values) => {
                        serializer.collect_seq(values.iter().map(|value| value.as_ref().map(Item)))
                    })+
                }
            }
        }
    };
}

/// Item serialization, overridable per item type.
trait SerializeItem: Serialize {
    fn serialize_item<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.serialize(serializer)
    }
}

struct Item<'a, T>(&'a T);

impl<T> Serialize for Item<'_, T>
where
    T: SerializeItem,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize_item(serializer)
    }
}

fn non_finite_name(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value.is_sign_positive() {
        "+Inf"
    } else {
        "-Inf"
    }
}

macro_rules! impl_plain_items {
    ($($ty:ty),+) => {
        $(impl SerializeItem for $ty {})+
    };
}

impl_plain_items!(i8, i16, i32, i64, u8, u16, u32, u64, bool, String, Timestamp);

impl SerializeItem for f32 {
    fn serialize_item<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_finite() {
            serializer.serialize_f32(*self)
        } else {
            serializer.serialize_str(non_finite_name(f64::from(*self)))
        }
    }
}

impl SerializeItem for f64 {
    fn serialize_item<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_finite() {
            serializer.serialize_f64(*self)
        } else {
            serializer.serialize_str(non_finite_name(*self))
        }
    }
}

define_item_types! {
    Int8 => i8, "int8";
    Int16 => i16, "int16";
    Int32 => i32, "int32";
    Int64 => i64, "int64";
    Uint8 => u8, "uint8";
    Uint16 => u16, "uint16";
    Uint32 => u32, "uint32";
    Uint64 => u64, "uint64";
    Float32 => f32, "float32";
    Float64 => f64, "float64";
    Bool => bool, "bool";
    String => String, "string";
    Time => Timestamp, "time";
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The type of a column: an item type, and whether items may be null.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FieldType {
    item_type: ItemType,
    nullable: bool,
}

impl FieldType {
    /// Creates a non-nullable field type.
    pub const fn of(item_type: ItemType) -> Self {
        Self {
            item_type,
            nullable: false,
        }
    }

    /// Returns the nullable counterpart of this type.
    pub const fn nullable(self) -> Self {
        Self {
            item_type: self.item_type,
            nullable: true,
        }
    }

    /// Returns the item type.
    pub const fn item_type(&self) -> ItemType {
        self.item_type
    }

    /// Returns `true` if items may be null.
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "nullable {}", self.item_type)
        } else {
            write!(f, "{}", self.item_type)
        }
    }
}
