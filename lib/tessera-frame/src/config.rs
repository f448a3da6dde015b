use serde::Deserialize;
use tessera_measurement::Measurement;

/// How measurements are grouped into tables.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// One table per measurement name.
    ///
    /// Tables span every timestamp seen for that name during a single conversion.
    #[default]
    ByName,

    /// One table per measurement name and timestamp.
    ///
    /// The table key is the name and the RFC 3339 timestamp joined by `@`, such as `cpu@2024-01-01T00:00:00+00:00`.
    ByNameAndTime,
}

impl GroupingMode {
    /// Returns the key of the table the given measurement belongs to.
    pub fn table_key(&self, measurement: &Measurement) -> String {
        match self {
            Self::ByName => measurement.name().to_string(),
            Self::ByNameAndTime => format!("{}@{}", measurement.name(), measurement.timestamp().to_rfc3339()),
        }
    }
}

/// Shape of the tables built from measurements.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Every series gets its own block of columns, with its tags attached to each column.
    #[default]
    Wide,

    /// Series share one column per field name, and tags are rendered into a `labels` column.
    Labels,
}

/// What happens when a measurement cannot be converted.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// The whole conversion fails, and no tables are returned.
    #[default]
    Abort,

    /// The offending measurement is logged and dropped, and conversion continues.
    ///
    /// A dropped measurement leaves nothing behind: no columns, no rows, no time entries.
    Skip,
}

/// Converter configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ConverterConfiguration {
    grouping: GroupingMode,
    layout: Layout,
    unify_numeric: bool,
    error_policy: ErrorPolicy,
}

impl ConverterConfiguration {
    /// Sets the grouping mode.
    ///
    /// Defaults to [`GroupingMode::ByName`].
    pub fn with_grouping(mut self, grouping: GroupingMode) -> Self {
        self.grouping = grouping;
        self
    }

    /// Sets the table layout.
    ///
    /// Only applies to measurements: metric families always use a fixed three-column schema.
    ///
    /// Defaults to [`Layout::Wide`].
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets whether or not numeric values are unified.
    ///
    /// When enabled, every integer and floating-point value is stored in a nullable `float64` column, regardless of
    /// its native width. Integers beyond 2^53 in magnitude lose precision.
    ///
    /// Defaults to `false`.
    pub fn with_unify_numeric(mut self, unify_numeric: bool) -> Self {
        self.unify_numeric = unify_numeric;
        self
    }

    /// Sets the error policy.
    ///
    /// Defaults to [`ErrorPolicy::Abort`].
    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    /// Returns the grouping mode.
    pub fn grouping(&self) -> GroupingMode {
        self.grouping
    }

    /// Returns the table layout.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Returns `true` if numeric values are unified.
    pub fn unify_numeric(&self) -> bool {
        self.unify_numeric
    }

    /// Returns the error policy.
    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn deserialize_partial() {
        let config: ConverterConfiguration =
            serde_json::from_str(r#"{"layout": "labels", "error_policy": "skip"}"#).unwrap();
        assert_eq!(config.grouping(), GroupingMode::ByName);
        assert_eq!(config.layout(), Layout::Labels);
        assert!(!config.unify_numeric());
        assert_eq!(config.error_policy(), ErrorPolicy::Skip);
    }

    #[test]
    fn deserialize_rejects_unknown_variants() {
        assert!(serde_json::from_str::<ConverterConfiguration>(r#"{"layout": "tall"}"#).is_err());
    }

    #[test]
    fn table_keys() {
        let ts = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let m = Measurement::new("cpu", ts).with_field("usage", 1.0);

        assert_eq!(GroupingMode::ByName.table_key(&m), "cpu");
        assert_eq!(GroupingMode::ByNameAndTime.table_key(&m), "cpu@2024-01-01T00:00:00+00:00");
    }
}
