use std::ops::Range;

use indexmap::map::Entry;
use tessera_common::{
    collections::{FastHashMap, FastIndexMap, PrehashedHashMap},
    hash::Fingerprint,
};
use tessera_measurement::{Measurement, Timestamp};
use tracing::{debug, trace, warn};

use super::FrameAssembler;
use crate::{coercion::Coercer, config::GroupingMode, Cell, Column, ConversionError, FieldType, ItemType, Table};

const TIME_COLUMN: usize = 0;

/// The contiguous, half-open range of columns owned by one series within a wide table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldInterval {
    start: usize,
    end: usize,
}

impl FieldInterval {
    /// Returns the index of the first column.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Returns the index one past the last column.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the interval holds no columns.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the column indices.
    pub fn columns(&self) -> Range<usize> {
        self.start..self.end
    }
}

struct WideTable {
    table: Table,
    rows: FastHashMap<Timestamp, usize>,
    intervals: PrehashedHashMap<Fingerprint, FieldInterval>,
}

impl WideTable {
    fn new(key: &str) -> Self {
        let mut table = Table::new(key);
        table.push_column(Column::new("time", FieldType::of(ItemType::Time), None));

        Self {
            table,
            rows: FastHashMap::default(),
            intervals: PrehashedHashMap::default(),
        }
    }
}

/// What ingesting a measurement will do, worked out before any table is touched.
enum Plan<'a> {
    /// The series is new to the table: allocate one column per field.
    Allocate { columns: Vec<(&'a str, FieldType, Cell)> },

    /// The series already owns an interval: write into it.
    Write {
        cells: Vec<(usize, Cell)>,
        dropped: Vec<&'a str>,
    },
}

/// Assembles tables where every series owns its own block of columns.
///
/// Each table starts with a `time` column, which holds every distinct timestamp seen for the table once, in first-seen
/// order. The first time a series (a name and tag set, identified by its fingerprint) shows up in a table, one column
/// is allocated per field, sorted by field key, and tagged with the series' tags. That block of columns is the series'
/// [`FieldInterval`], and every later measurement of the series writes into it, on the row of its timestamp.
///
/// Rows where a series did not report are null. A series reporting the same timestamp twice overwrites its earlier
/// values.
///
/// Fields are matched to columns by key. A repeated field key maps to the column allocated for the same occurrence of
/// that key, so the second `usage` field of a measurement always lands in the second `usage` column of its interval.
/// Fields which were not present when the interval was allocated have no column, and are dropped.
pub struct WideColumnAssembler {
    coercer: Coercer,
    grouping: GroupingMode,
    tables: FastIndexMap<String, WideTable>,
}

impl WideColumnAssembler {
    /// Creates a new `WideColumnAssembler`.
    pub fn new(coercer: Coercer, grouping: GroupingMode) -> Self {
        Self {
            coercer,
            grouping,
            tables: FastIndexMap::default(),
        }
    }

    /// Returns the interval allocated for the given series in the given table, if any.
    pub fn interval(&self, table_key: &str, fingerprint: Fingerprint) -> Option<FieldInterval> {
        self.tables
            .get(table_key)
            .and_then(|wide| wide.intervals.get(&fingerprint))
            .copied()
    }

    fn prepare<'a>(
        &self, table_key: &str, fingerprint: Fingerprint, measurement: &'a Measurement,
    ) -> Result<Plan<'a>, ConversionError> {
        let name = measurement.name();
        let fields = measurement.sorted_fields();

        let existing = self
            .tables
            .get(table_key)
            .and_then(|wide| wide.intervals.get(&fingerprint).map(|interval| (wide, *interval)));

        let Some((wide, interval)) = existing else {
            let mut columns = Vec::with_capacity(fields.len());
            for (field, value) in fields {
                let (field_type, cell) = self.coercer.coerce(name, field, value)?;
                columns.push((field, field_type, cell));
            }

            return Ok(Plan::Allocate { columns });
        };

        let mut occurrences = FastHashMap::<&str, usize>::default();
        let mut cells = Vec::with_capacity(fields.len());
        let mut dropped = Vec::new();
        for (field, value) in fields {
            let occurrence = occurrences.entry(field).or_insert(0);
            let target = interval
                .columns()
                .filter(|idx| wide.table.column_at(*idx).name() == field)
                .nth(*occurrence);
            *occurrence += 1;

            match target {
                Some(idx) => {
                    let field_type = wide.table.column_at(idx).field_type();
                    let cell = self.coercer.coerce_into(field_type, name, field, value)?;
                    cells.push((idx, cell));
                }
                None => dropped.push(field),
            }
        }

        Ok(Plan::Write { cells, dropped })
    }
}

impl FrameAssembler for WideColumnAssembler {
    type Input = Measurement;

    fn ingest(&mut self, measurement: &Measurement) -> Result<(), ConversionError> {
        let table_key = self.grouping.table_key(measurement);
        let fingerprint = measurement.fingerprint();
        let plan = self.prepare(&table_key, fingerprint, measurement)?;

        let wide = match self.tables.entry(table_key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!(table = %entry.key(), "Allocated table.");
                let wide = WideTable::new(entry.key());
                entry.insert(wide)
            }
        };

        let timestamp = measurement.timestamp();
        let next_row = wide.rows.len();
        let row = *wide.rows.entry(timestamp).or_insert(next_row);
        if row == next_row {
            wide.table.column_at_mut(TIME_COLUMN).set(row, Cell::Time(timestamp));
        }

        match plan {
            Plan::Allocate { columns } => {
                let start = wide.table.column_count();
                for (field, field_type, cell) in columns {
                    let mut column = Column::new(field, field_type, Some(measurement.tags().clone()));
                    column.set(row, cell);
                    wide.table.push_column(column);
                }

                let interval = FieldInterval {
                    start,
                    end: wide.table.column_count(),
                };
                wide.intervals.insert(fingerprint, interval);

                debug!(
                    table = wide.table.key(),
                    %fingerprint,
                    tags = %measurement.tags(),
                    start = interval.start,
                    end = interval.end,
                    "Allocated series interval."
                );
            }
            Plan::Write { cells, dropped } => {
                for (idx, cell) in cells {
                    if wide.table.column_at_mut(idx).set(row, cell) {
                        debug!(
                            table = wide.table.key(),
                            %fingerprint,
                            column = idx,
                            row,
                            "Overwrote value for repeated series timestamp."
                        );
                    }
                }

                if !dropped.is_empty() {
                    warn!(
                        table = wide.table.key(),
                        %fingerprint,
                        fields = ?dropped,
                        "Dropped fields which were not present when the series was first seen."
                    );
                }
            }
        }

        trace!(table = wide.table.key(), %fingerprint, row, "Ingested measurement.");

        Ok(())
    }

    fn finish(self) -> Vec<Table> {
        self.tables
            .into_values()
            .map(|wide| {
                let rows = wide.rows.len();
                let mut table = wide.table;
                table.pad_to(rows);
                table
            })
            .collect()
    }
}
