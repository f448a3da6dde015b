use serde::Serialize;

use crate::Column;

/// An ordered set of columns, identified by a key.
///
/// Column order is fixed once a column is added. Every column of a table returned by a converter holds the same number
/// of rows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    #[serde(rename = "name")]
    key: String,

    #[serde(rename = "fields")]
    columns: Vec<Column>,
}

impl Table {
    pub(crate) fn new<K>(key: K) -> Self
    where
        K: Into<String>,
    {
        Self {
            key: key.into(),
            columns: Vec::new(),
        }
    }

    /// Returns the key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the columns.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Gets the first column with the given name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name() == name)
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Column::len).max().unwrap_or(0)
    }

    /// Serializes the table as JSON.
    ///
    /// The document holds the table key under `name`, and the columns under `fields`. Nulls are rendered as `null`,
    /// and times as RFC 3339 strings.
    ///
    /// # Errors
    ///
    /// If the table cannot be serialized, an error is returned.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub(crate) fn push_column(&mut self, column: Column) -> usize {
        self.columns.push(column);
        self.columns.len() - 1
    }

    pub(crate) fn column_at(&self, idx: usize) -> &Column {
        &self.columns[idx]
    }

    pub(crate) fn column_at_mut(&mut self, idx: usize) -> &mut Column {
        &mut self.columns[idx]
    }

    pub(crate) fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Pads every column with nulls until all of them hold `rows` rows.
    pub(crate) fn pad_to(&mut self, rows: usize) {
        for column in &mut self.columns {
            column.pad_to(rows);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use similar_asserts::assert_eq;
    use tessera_measurement::TagSet;

    use super::*;
    use crate::{Cell, FieldType, ItemType};

    #[test]
    fn serialize_to_json() {
        let ts = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut table = Table::new("cpu");
        let time = table.push_column(Column::new("time", FieldType::of(ItemType::Time), None));
        let usage = table.push_column(Column::new(
            "usage",
            FieldType::of(ItemType::Float64).nullable(),
            Some(TagSet::from_iter([("host", "a")])),
        ));
        table.column_at_mut(time).set(0, Cell::Time(ts));
        table.column_at_mut(time).set(1, Cell::Time(ts + chrono::Duration::seconds(10)));
        table.column_at_mut(usage).set(0, Cell::Float64(10.5));
        table.pad_to(2);

        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.to_json().unwrap(),
            concat!(
                r#"{"name":"cpu","fields":["#,
                r#"{"name":"time","type":"time","nullable":false,"values":["2024-01-01T00:00:00Z","2024-01-01T00:00:10Z"]},"#,
                r#"{"name":"usage","type":"float64","nullable":true,"labels":{"host":"a"},"values":[10.5,null]}"#,
                r#"]}"#
            )
        );
    }

    #[test]
    fn non_finite_floats_are_distinct_from_nulls() {
        let mut table = Table::new("gauges");
        let f64_idx = table.push_column(Column::new("f64", FieldType::of(ItemType::Float64).nullable(), None));
        let f32_idx = table.push_column(Column::new("f32", FieldType::of(ItemType::Float32).nullable(), None));

        let f64_column = table.column_at_mut(f64_idx);
        f64_column.set(0, Cell::Float64(f64::NAN));
        f64_column.set(1, Cell::Float64(f64::INFINITY));
        f64_column.set(3, Cell::Float64(f64::NEG_INFINITY));
        f64_column.set(4, Cell::Float64(1.5));

        let f32_column = table.column_at_mut(f32_idx);
        f32_column.set(0, Cell::Float32(f32::NAN));
        f32_column.set(2, Cell::Float32(f32::NEG_INFINITY));
        f32_column.set(3, Cell::Float32(0.5));
        table.pad_to(5);

        assert_eq!(
            table.to_json().unwrap(),
            concat!(
                r#"{"name":"gauges","fields":["#,
                r#"{"name":"f64","type":"float64","nullable":true,"values":["NaN","+Inf",null,"-Inf",1.5]},"#,
                r#"{"name":"f32","type":"float32","nullable":true,"values":["NaN",null,"-Inf",0.5,null]}"#,
                r#"]}"#
            )
        );
    }

    #[test]
    fn empty_table_has_no_rows() {
        assert_eq!(Table::new("empty").row_count(), 0);
    }
}
