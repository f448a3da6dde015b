use std::{fmt, time::Duration};

use serde::Deserialize;

use crate::Timestamp;

/// The native value of a measurement field.
///
/// Decoders produce whatever their format can express, which is a wider set than what a table column can hold. Most
/// variants map onto a column type directly; `Bytes` and `Duration` have no column counterpart and are rejected when
/// converted into a table.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(from = "WireFieldValue")]
pub enum FieldValue {
    /// Signed 8-bit integer.
    I8(i8),

    /// Signed 16-bit integer.
    I16(i16),

    /// Signed 32-bit integer.
    I32(i32),

    /// Signed 64-bit integer.
    I64(i64),

    /// Unsigned 8-bit integer.
    U8(u8),

    /// Unsigned 16-bit integer.
    U16(u16),

    /// Unsigned 32-bit integer.
    U32(u32),

    /// Unsigned 64-bit integer.
    U64(u64),

    /// 32-bit floating point.
    F32(f32),

    /// 64-bit floating point.
    F64(f64),

    /// Boolean.
    Bool(bool),

    /// UTF-8 string.
    String(String),

    /// Point in time.
    Time(Timestamp),

    /// Raw bytes.
    Bytes(Vec<u8>),

    /// Span of time.
    Duration(Duration),
}

impl FieldValue {
    /// Returns the name of this value's type, as used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::I8(_) => "int8",
            Self::I16(_) => "int16",
            Self::I32(_) => "int32",
            Self::I64(_) => "int64",
            Self::U8(_) => "uint8",
            Self::U16(_) => "uint16",
            Self::U32(_) => "uint32",
            Self::U64(_) => "uint64",
            Self::F32(_) => "float32",
            Self::F64(_) => "float64",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Time(_) => "time",
            Self::Bytes(_) => "bytes",
            Self::Duration(_) => "duration",
        }
    }

    /// Returns `true` if this value is an integer or floating-point number.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::I8(_)
                | Self::I16(_)
                | Self::I32(_)
                | Self::I64(_)
                | Self::U8(_)
                | Self::U16(_)
                | Self::U32(_)
                | Self::U64(_)
                | Self::F32(_)
                | Self::F64(_)
        )
    }

    /// Returns this value as an `f64`, if it is numeric.
    ///
    /// Integers beyond 2^53 in magnitude lose precision.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::I8(v) => Some(f64::from(*v)),
            Self::I16(v) => Some(f64::from(*v)),
            Self::I32(v) => Some(f64::from(*v)),
            Self::I64(v) => Some(*v as f64),
            Self::U8(v) => Some(f64::from(*v)),
            Self::U16(v) => Some(f64::from(*v)),
            Self::U32(v) => Some(f64::from(*v)),
            Self::U64(v) => Some(*v as f64),
            Self::F32(v) => Some(f64::from(*v)),
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I8(v) => write!(f, "{}", v),
            Self::I16(v) => write!(f, "{}", v),
            Self::I32(v) => write!(f, "{}", v),
            Self::I64(v) => write!(f, "{}", v),
            Self::U8(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::F32(v) => write!(f, "{}", v),
            Self::F64(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::Time(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Bytes(v) => write!(f, "{:?}", v),
            Self::Duration(v) => write!(f, "{:?}", v),
        }
    }
}

macro_rules! impl_from_native {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )+
    };
}

impl_from_native! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => String,
    Timestamp => Time,
    Vec<u8> => Bytes,
    Duration => Duration,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Field values as they appear in JSON: the decoder's choice of integer width is lost, so integers come back as the
/// narrowest of `int64`/`uint64` that holds them.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireFieldValue {
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
}

impl From<WireFieldValue> for FieldValue {
    fn from(value: WireFieldValue) -> Self {
        match value {
            WireFieldValue::Bool(v) => Self::Bool(v),
            WireFieldValue::Signed(v) => Self::I64(v),
            WireFieldValue::Unsigned(v) => Self::U64(v),
            WireFieldValue::Float(v) => Self::F64(v),
            WireFieldValue::String(v) => Self::String(v),
        }
    }
}
