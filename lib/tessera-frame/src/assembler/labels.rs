use indexmap::map::Entry;
use tessera_common::collections::{FastHashMap, FastIndexMap};
use tessera_measurement::Measurement;
use tracing::{debug, trace};

use super::FrameAssembler;
use crate::{coercion::Coercer, config::GroupingMode, Cell, Column, ConversionError, FieldType, ItemType, Table};

const TIME_COLUMN: usize = 0;
const LABELS_COLUMN: usize = 1;

struct LabelTable {
    table: Table,
    rows: usize,
    fields: FastHashMap<String, usize>,
}

impl LabelTable {
    fn new(key: &str) -> Self {
        let mut table = Table::new(key);
        table.push_column(Column::new("time", FieldType::of(ItemType::Time), None));
        table.push_column(Column::new("labels", FieldType::of(ItemType::String), None));

        Self {
            table,
            rows: 0,
            fields: FastHashMap::default(),
        }
    }
}

/// Assembles tables where series share columns, and tags are rendered into a column of their own.
///
/// Each table has a `time` and a `labels` column, followed by one column per distinct field key, in the order the
/// keys were first seen. Every measurement adds one row: its timestamp, its tags rendered as `key=value` pairs, and
/// its field values, visited in key order. Columns for fields a measurement did not carry are null on that row,
/// including the rows that came before a field key was first seen.
///
/// A field key repeated within a single measurement lands in the same column, so only its last value is kept.
pub struct LabelColumnAssembler {
    coercer: Coercer,
    grouping: GroupingMode,
    tables: FastIndexMap<String, LabelTable>,
}

impl LabelColumnAssembler {
    /// Creates a new `LabelColumnAssembler`.
    pub fn new(coercer: Coercer, grouping: GroupingMode) -> Self {
        Self {
            coercer,
            grouping,
            tables: FastIndexMap::default(),
        }
    }

    fn prepare<'a>(
        &self, table_key: &str, measurement: &'a Measurement,
    ) -> Result<Vec<(&'a str, FieldType, Cell)>, ConversionError> {
        let name = measurement.name();
        let existing = self.tables.get(table_key);
        let mut pending = FastHashMap::<&str, FieldType>::default();

        let fields = measurement.sorted_fields();
        let mut cells = Vec::with_capacity(fields.len());
        for (field, value) in fields {
            let known_type = existing
                .and_then(|labels| {
                    let idx = labels.fields.get(field)?;
                    Some(labels.table.column_at(*idx).field_type())
                })
                .or_else(|| pending.get(field).copied());

            let (field_type, cell) = match known_type {
                Some(field_type) => (field_type, self.coercer.coerce_into(field_type, name, field, value)?),
                None => self.coercer.coerce(name, field, value)?,
            };
            pending.entry(field).or_insert(field_type);
            cells.push((field, field_type, cell));
        }

        Ok(cells)
    }
}

impl FrameAssembler for LabelColumnAssembler {
    type Input = Measurement;

    fn ingest(&mut self, measurement: &Measurement) -> Result<(), ConversionError> {
        let table_key = self.grouping.table_key(measurement);
        let cells = self.prepare(&table_key, measurement)?;

        let labels = match self.tables.entry(table_key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!(table = %entry.key(), "Allocated table.");
                let labels = LabelTable::new(entry.key());
                entry.insert(labels)
            }
        };

        let row = labels.rows;
        labels.rows += 1;

        let table = &mut labels.table;
        table.column_at_mut(TIME_COLUMN).set(row, Cell::Time(measurement.timestamp()));
        table
            .column_at_mut(LABELS_COLUMN)
            .set(row, Cell::String(measurement.tags().to_string()));

        for (field, field_type, cell) in cells {
            let idx = match labels.fields.get(field) {
                Some(idx) => *idx,
                None => {
                    let idx = table.push_column(Column::new(field, field_type, None));
                    labels.fields.insert(field.to_string(), idx);
                    debug!(table = table.key(), field, %field_type, "Allocated field column.");
                    idx
                }
            };

            if table.column_at_mut(idx).set(row, cell) {
                debug!(table = table.key(), field, row, "Overwrote value of repeated field key.");
            }
        }

        trace!(table = table.key(), row, "Ingested measurement.");

        Ok(())
    }

    fn finish(self) -> Vec<Table> {
        self.tables
            .into_values()
            .map(|labels| {
                let mut table = labels.table;
                table.pad_to(labels.rows);
                table
            })
            .collect()
    }
}
