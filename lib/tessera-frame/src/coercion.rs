//! Type inference and value coercion.
//!
//! Every value that ends up in a table passes through here. Inference maps a native [`FieldValue`] onto a column type,
//! always the nullable variant, since any column may have holes where a series did not report. Conversion then turns
//! the native value into a [`Cell`] of that type, using a converter looked up from a [`ConverterRegistry`].
//!
//! When numeric unification is enabled, every integer and floating-point width infers as a nullable `float64`. This
//! trades precision (integers beyond 2^53 round) for a smaller, more stable set of column types.

use std::{fmt, sync::Arc};

use tessera_common::collections::FastHashMap;
use tessera_measurement::FieldValue;

use crate::{
    error::{NoConverterForType, UnknownValueType, ValueConversionFailed},
    Cell, ConversionError, FieldType, ItemType,
};

/// A value converter.
///
/// Converts a native value into a cell of the converter's item type, or explains why it cannot.
pub type ConvertFn = fn(&FieldValue) -> Result<Cell, String>;

/// Infers the column type of a native value.
///
/// Returns `None` if the value has no column type counterpart. The returned type is always nullable.
pub fn infer_field_type(value: &FieldValue, unify_numeric: bool) -> Option<FieldType> {
    if unify_numeric && value.is_numeric() {
        return Some(FieldType::of(ItemType::Float64).nullable());
    }

    let item_type = match value {
        FieldValue::I8(_) => ItemType::Int8,
        FieldValue::I16(_) => ItemType::Int16,
        FieldValue::I32(_) => ItemType::Int32,
        FieldValue::I64(_) => ItemType::Int64,
        FieldValue::U8(_) => ItemType::Uint8,
        FieldValue::U16(_) => ItemType::Uint16,
        FieldValue::U32(_) => ItemType::Uint32,
        FieldValue::U64(_) => ItemType::Uint64,
        FieldValue::F32(_) => ItemType::Float32,
        FieldValue::F64(_) => ItemType::Float64,
        FieldValue::Bool(_) => ItemType::Bool,
        FieldValue::String(_) => ItemType::String,
        FieldValue::Time(_) => ItemType::Time,
        FieldValue::Bytes(_) | FieldValue::Duration(_) => return None,
    };

    Some(FieldType::of(item_type).nullable())
}

/// A registry of value converters, keyed by column type.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: FastHashMap<FieldType, ConvertFn>,
}

impl ConverterRegistry {
    /// Creates an empty registry.
    ///
    /// Every conversion fails with [`ConversionError::NoConverterForType`] until converters are registered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a registry with a converter for the nullable variant of every item type.
    ///
    /// The default converters behave as follows:
    ///
    /// - integer types accept any integer value that fits in the target width
    /// - `float32` accepts `float32` values and integers of up to 16 bits, which it represents exactly
    /// - `float64` accepts any numeric value
    /// - `bool` and `time` accept only values of their own type
    /// - `string` accepts any value, rendered as text
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(ItemType::Int8, |v| convert_integer::<i8>(v).map(Cell::Int8));
        registry.register(ItemType::Int16, |v| convert_integer::<i16>(v).map(Cell::Int16));
        registry.register(ItemType::Int32, |v| convert_integer::<i32>(v).map(Cell::Int32));
        registry.register(ItemType::Int64, |v| convert_integer::<i64>(v).map(Cell::Int64));
        registry.register(ItemType::Uint8, |v| convert_integer::<u8>(v).map(Cell::Uint8));
        registry.register(ItemType::Uint16, |v| convert_integer::<u16>(v).map(Cell::Uint16));
        registry.register(ItemType::Uint32, |v| convert_integer::<u32>(v).map(Cell::Uint32));
        registry.register(ItemType::Uint64, |v| convert_integer::<u64>(v).map(Cell::Uint64));
        registry.register(ItemType::Float32, convert_float32);
        registry.register(ItemType::Float64, convert_float64);
        registry.register(ItemType::Bool, convert_bool);
        registry.register(ItemType::String, convert_string);
        registry.register(ItemType::Time, convert_time);
        registry
    }

    /// Registers a converter for the nullable variant of the given item type, replacing any existing one.
    pub fn register(&mut self, item_type: ItemType, convert: ConvertFn) {
        self.converters.insert(FieldType::of(item_type).nullable(), convert);
    }

    /// Removes the converter for the nullable variant of the given item type.
    pub fn unregister(&mut self, item_type: ItemType) {
        self.converters.remove(&FieldType::of(item_type).nullable());
    }

    /// Gets the converter for the given column type.
    pub fn get(&self, field_type: FieldType) -> Option<ConvertFn> {
        self.converters.get(&field_type).copied()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut field_types = self.converters.keys().collect::<Vec<_>>();
        field_types.sort();
        f.debug_struct("ConverterRegistry").field("field_types", &field_types).finish()
    }
}

/// Coerces native values into cells.
///
/// Cheap to clone: the registry is shared.
#[derive(Clone, Debug)]
pub struct Coercer {
    registry: Arc<ConverterRegistry>,
    unify_numeric: bool,
}

impl Coercer {
    /// Creates a new `Coercer`.
    pub fn new(registry: Arc<ConverterRegistry>, unify_numeric: bool) -> Self {
        Self {
            registry,
            unify_numeric,
        }
    }

    /// Infers the column type for a value and converts it.
    ///
    /// # Errors
    ///
    /// If the value's type is unsupported, if no converter is registered for the inferred type, or if the converter
    /// rejects the value, an error is returned.
    pub fn coerce(
        &self, measurement: &str, field: &str, value: &FieldValue,
    ) -> Result<(FieldType, Cell), ConversionError> {
        let field_type = self.infer(measurement, field, value)?;
        let cell = self.convert(field_type, measurement, field, value)?;
        Ok((field_type, cell))
    }

    /// Converts a value into an existing column's type.
    ///
    /// Used when a value lands in a column that was allocated earlier, possibly from a value of another type.
    ///
    /// # Errors
    ///
    /// If the value's type is unsupported, if no converter is registered for the column's type, or if the converter
    /// rejects the value, an error is returned.
    pub fn coerce_into(
        &self, field_type: FieldType, measurement: &str, field: &str, value: &FieldValue,
    ) -> Result<Cell, ConversionError> {
        self.infer(measurement, field, value)?;
        self.convert(field_type, measurement, field, value)
    }

    pub(crate) fn infer(
        &self, measurement: &str, field: &str, value: &FieldValue,
    ) -> Result<FieldType, ConversionError> {
        match infer_field_type(value, self.unify_numeric) {
            Some(field_type) => Ok(field_type),
            None => UnknownValueType {
                measurement,
                field,
                value_type: value.type_name(),
            }
            .fail(),
        }
    }

    fn convert(
        &self, field_type: FieldType, measurement: &str, field: &str, value: &FieldValue,
    ) -> Result<Cell, ConversionError> {
        let Some(convert) = self.registry.get(field_type) else {
            return NoConverterForType {
                measurement,
                field,
                field_type,
                value_type: value.type_name(),
            }
            .fail();
        };

        let cell = match convert(value) {
            Ok(cell) => cell,
            Err(reason) => {
                return ValueConversionFailed {
                    measurement,
                    field,
                    field_type,
                    value_type: value.type_name(),
                    reason,
                }
                .fail()
            }
        };

        if cell.item_type() != field_type.item_type() {
            return ValueConversionFailed {
                measurement,
                field,
                field_type,
                value_type: value.type_name(),
                reason: format!("converter produced a '{}' value", cell.item_type()),
            }
            .fail();
        }

        Ok(cell)
    }
}

fn convert_integer<T>(value: &FieldValue) -> Result<T, String>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    let converted = match value {
        FieldValue::I8(v) => <T as TryFrom<i64>>::try_from(i64::from(*v)).ok(),
        FieldValue::I16(v) => <T as TryFrom<i64>>::try_from(i64::from(*v)).ok(),
        FieldValue::I32(v) => <T as TryFrom<i64>>::try_from(i64::from(*v)).ok(),
        FieldValue::I64(v) => <T as TryFrom<i64>>::try_from(*v).ok(),
        FieldValue::U8(v) => <T as TryFrom<u64>>::try_from(u64::from(*v)).ok(),
        FieldValue::U16(v) => <T as TryFrom<u64>>::try_from(u64::from(*v)).ok(),
        FieldValue::U32(v) => <T as TryFrom<u64>>::try_from(u64::from(*v)).ok(),
        FieldValue::U64(v) => <T as TryFrom<u64>>::try_from(*v).ok(),
        other => return Err(format!("'{}' values are not integers", other.type_name())),
    };

    converted.ok_or_else(|| format!("value {} is out of range", value))
}

fn convert_float32(value: &FieldValue) -> Result<Cell, String> {
    match value {
        FieldValue::F32(v) => Ok(Cell::Float32(*v)),
        FieldValue::I8(v) => Ok(Cell::Float32(f32::from(*v))),
        FieldValue::I16(v) => Ok(Cell::Float32(f32::from(*v))),
        FieldValue::U8(v) => Ok(Cell::Float32(f32::from(*v))),
        FieldValue::U16(v) => Ok(Cell::Float32(f32::from(*v))),
        other => Err(format!("'{}' values cannot be represented exactly", other.type_name())),
    }
}

fn convert_float64(value: &FieldValue) -> Result<Cell, String> {
    value
        .as_f64()
        .map(Cell::Float64)
        .ok_or_else(|| format!("'{}' values are not numeric", value.type_name()))
}

fn convert_bool(value: &FieldValue) -> Result<Cell, String> {
    match value {
        FieldValue::Bool(v) => Ok(Cell::Bool(*v)),
        other => Err(format!("'{}' values are not booleans", other.type_name())),
    }
}

fn convert_string(value: &FieldValue) -> Result<Cell, String> {
    match value {
        FieldValue::String(v) => Ok(Cell::String(v.clone())),
        other => Ok(Cell::String(other.to_string())),
    }
}

fn convert_time(value: &FieldValue) -> Result<Cell, String> {
    match value {
        FieldValue::Time(v) => Ok(Cell::Time(*v)),
        other => Err(format!("'{}' values are not timestamps", other.type_name())),
    }
}
