use snafu::Snafu;

use crate::FieldType;

/// A conversion error.
///
/// Every variant names the measurement and the field that could not be converted, along with enough type information
/// to tell why. Conversion is deterministic, so retrying with the same input always fails the same way.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum ConversionError {
    /// The value's runtime type has no column type counterpart.
    #[snafu(display(
        "Unknown value type '{}' for field '{}' of measurement '{}'.",
        value_type,
        field,
        measurement
    ))]
    UnknownValueType {
        /// Name of the measurement carrying the field.
        measurement: String,

        /// Key of the field.
        field: String,

        /// Type of the offending value.
        value_type: &'static str,
    },

    /// No converter is registered for the column type the value was mapped to.
    #[snafu(display(
        "No converter registered for '{}' (field '{}' of measurement '{}', value type '{}').",
        field_type,
        field,
        measurement,
        value_type
    ))]
    NoConverterForType {
        /// Name of the measurement carrying the field.
        measurement: String,

        /// Key of the field.
        field: String,

        /// Column type the value was being converted into.
        field_type: FieldType,

        /// Type of the offending value.
        value_type: &'static str,
    },

    /// The registered converter rejected the value.
    #[snafu(display(
        "Failed to convert '{}' value of field '{}' (measurement '{}') to '{}': {}",
        value_type,
        field,
        measurement,
        field_type,
        reason
    ))]
    ValueConversionFailed {
        /// Name of the measurement carrying the field.
        measurement: String,

        /// Key of the field.
        field: String,

        /// Column type the value was being converted into.
        field_type: FieldType,

        /// Type of the offending value.
        value_type: &'static str,

        /// Why the converter rejected the value.
        reason: String,
    },
}
