use serde::{ser::SerializeStruct as _, Serialize, Serializer};
use tessera_measurement::TagSet;

use crate::{Cell, ColumnValues, FieldType};

/// A named, typed column.
///
/// Columns built by the wide layout carry the tags of the series they belong to. Columns built by the other layouts
/// carry no tags.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    name: String,
    field_type: FieldType,
    labels: Option<TagSet>,
    values: ColumnValues,
}

impl Column {
    pub(crate) fn new<N>(name: N, field_type: FieldType, labels: Option<TagSet>) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            field_type,
            labels,
            values: ColumnValues::empty(field_type.item_type()),
        }
    }

    /// Returns the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns the attached tags, if any.
    pub fn labels(&self) -> Option<&TagSet> {
        self.labels.as_ref()
    }

    /// Returns the values.
    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value at the given row, or `None` if the row is null or out of bounds.
    pub fn get(&self, row: usize) -> Option<Cell> {
        self.values.get(row)
    }

    pub(crate) fn set(&mut self, row: usize, cell: Cell) -> bool {
        self.values.set(row, cell)
    }

    pub(crate) fn pad_to(&mut self, len: usize) {
        self.values.pad_to(len)
    }
}

impl Serialize for Column {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = if self.labels.is_some() { 5 } else { 4 };
        let mut state = serializer.serialize_struct("Column", len)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("type", self.field_type.item_type().name())?;
        state.serialize_field("nullable", &self.field_type.is_nullable())?;
        match &self.labels {
            Some(labels) => state.serialize_field("labels", labels)?,
            None => state.skip_field("labels")?,
        }
        state.serialize_field("values", &self.values)?;
        state.end()
    }
}
