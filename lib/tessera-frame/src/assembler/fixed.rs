use indexmap::map::Entry;
use tessera_common::collections::FastIndexMap;
use tessera_measurement::{FamilySamples, FieldValue, MetricFamily, MetricKind, TagSet, Timestamp};
use tracing::{debug, trace};

use super::FrameAssembler;
use crate::{coercion::Coercer, Cell, Column, ConversionError, FieldType, ItemType, Table};

const TIME_COLUMN: usize = 0;
const LABEL_COLUMN: usize = 1;
const VALUE_COLUMN: usize = 2;

const VALUE_FIELD: &str = "value";

struct FixedTable {
    table: Table,
    rows: usize,
}

impl FixedTable {
    fn new(key: &str, value_type: FieldType) -> Self {
        let mut table = Table::new(key);
        table.push_column(Column::new("time", FieldType::of(ItemType::Time), None));
        table.push_column(Column::new("label", FieldType::of(ItemType::String), None));
        table.push_column(Column::new(VALUE_FIELD, value_type, None));

        Self { table, rows: 0 }
    }
}

/// Assembles metric families into tables with a fixed `time`, `label`, `value` schema.
///
/// Every family name gets one table; families sharing a name are merged into it. Counter, gauge, and untyped samples
/// produce one row each. Summary samples produce one row per quantile, labelled with an extra `quantile` tag, and
/// histogram samples produce one row per bucket, labelled with an extra `le` tag holding the bucket's upper bound.
/// The sample count and sum of summaries and histograms are not materialized. A sample which already carries a
/// `quantile` or `le` label has it replaced by the synthetic one, as a tag set holds each key at most once.
///
/// Values are `float64`, except for histogram bucket counts which are `uint64` unless numeric values are unified.
/// Samples without an explicit timestamp are stamped with the observation time the assembler was created with.
pub struct FixedSchemaAssembler {
    coercer: Coercer,
    observed_at: Timestamp,
    tables: FastIndexMap<String, FixedTable>,
}

impl FixedSchemaAssembler {
    /// Creates a new `FixedSchemaAssembler`.
    pub fn new(coercer: Coercer, observed_at: Timestamp) -> Self {
        Self {
            coercer,
            observed_at,
            tables: FastIndexMap::default(),
        }
    }

    fn expand(&self, family: &MetricFamily) -> Vec<(Timestamp, String, FieldValue)> {
        let stamp = |timestamp: Option<Timestamp>| timestamp.unwrap_or(self.observed_at);

        match family.samples() {
            FamilySamples::Counter(samples) | FamilySamples::Gauge(samples) | FamilySamples::Untyped(samples) => samples
                .iter()
                .map(|sample| (stamp(sample.timestamp), sample.labels.to_string(), FieldValue::F64(sample.value)))
                .collect(),
            FamilySamples::Summary(samples) => samples
                .iter()
                .flat_map(|sample| {
                    sample.quantiles.iter().map(move |quantile| {
                        (
                            stamp(sample.timestamp),
                            render_with_bound(&sample.labels, "quantile", quantile.quantile),
                            FieldValue::F64(quantile.value),
                        )
                    })
                })
                .collect(),
            FamilySamples::Histogram(samples) => samples
                .iter()
                .flat_map(|sample| {
                    sample.buckets.iter().map(move |bucket| {
                        (
                            stamp(sample.timestamp),
                            render_with_bound(&sample.labels, "le", bucket.upper_bound),
                            FieldValue::U64(bucket.cumulative_count),
                        )
                    })
                })
                .collect(),
        }
    }

    fn prepare(&self, family: &MetricFamily) -> Result<(FieldType, Vec<(Timestamp, String, Cell)>), ConversionError> {
        let name = family.name();
        let value_type = match self.tables.get(name) {
            Some(fixed) => fixed.table.column_at(VALUE_COLUMN).field_type(),
            None => self.coercer.infer(name, VALUE_FIELD, &native_value_of(family.kind()))?,
        };

        let rows = self
            .expand(family)
            .into_iter()
            .map(|(timestamp, label, value)| {
                let cell = self.coercer.coerce_into(value_type, name, VALUE_FIELD, &value)?;
                Ok((timestamp, label, cell))
            })
            .collect::<Result<Vec<_>, ConversionError>>()?;

        Ok((value_type, rows))
    }
}

impl FrameAssembler for FixedSchemaAssembler {
    type Input = MetricFamily;

    fn ingest(&mut self, family: &MetricFamily) -> Result<(), ConversionError> {
        let (value_type, rows) = self.prepare(family)?;

        let fixed = match self.tables.entry(family.name().to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!(table = %entry.key(), kind = %family.kind(), %value_type, "Allocated table.");
                let fixed = FixedTable::new(entry.key(), value_type);
                entry.insert(fixed)
            }
        };

        let added = rows.len();
        for (timestamp, label, cell) in rows {
            let row = fixed.rows;
            fixed.rows += 1;

            fixed.table.column_at_mut(TIME_COLUMN).set(row, Cell::Time(timestamp));
            fixed.table.column_at_mut(LABEL_COLUMN).set(row, Cell::String(label));
            fixed.table.column_at_mut(VALUE_COLUMN).set(row, cell);
        }

        trace!(table = fixed.table.key(), kind = %family.kind(), rows = added, "Ingested metric family.");

        Ok(())
    }

    fn finish(self) -> Vec<Table> {
        self.tables
            .into_values()
            .map(|fixed| {
                let mut table = fixed.table;
                table.pad_to(fixed.rows);
                table
            })
            .collect()
    }
}

/// A representative native value for the given metric kind, used to pick the value column type of a new table.
fn native_value_of(kind: MetricKind) -> FieldValue {
    match kind {
        MetricKind::Histogram => FieldValue::U64(0),
        MetricKind::Counter | MetricKind::Gauge | MetricKind::Summary | MetricKind::Untyped => FieldValue::F64(0.0),
    }
}

fn render_with_bound(labels: &TagSet, key: &str, bound: f64) -> String {
    labels.with_tag(key, format_bound(bound)).to_string()
}

fn format_bound(bound: f64) -> String {
    if bound.is_nan() {
        "NaN".to_string()
    } else if bound == f64::INFINITY {
        "+Inf".to_string()
    } else if bound == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        format!("{:.6}", bound)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone as _;
    use tessera_measurement::{Bucket, HistogramSample, Quantile, ScalarSample, SummarySample};

    use super::*;
    use crate::ConverterRegistry;

    fn ts(secs: i64) -> Timestamp {
        chrono::Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn assembler(unify_numeric: bool) -> FixedSchemaAssembler {
        let coercer = Coercer::new(Arc::new(ConverterRegistry::with_defaults()), unify_numeric);
        FixedSchemaAssembler::new(coercer, ts(100))
    }

    fn labels(table: &Table) -> Vec<String> {
        (0..table.row_count())
            .filter_map(|row| match table.columns()[LABEL_COLUMN].get(row) {
                Some(Cell::String(label)) => Some(label),
                _ => None,
            })
            .collect()
    }

    fn scalar(host: &str, timestamp: Option<Timestamp>, value: f64) -> ScalarSample {
        ScalarSample {
            labels: TagSet::from_iter([("host", host)]),
            timestamp,
            value,
        }
    }

    #[test]
    fn counter_rows() {
        let family = MetricFamily::new(
            "requests_total",
            FamilySamples::Counter(vec![scalar("a", Some(ts(0)), 3.0), scalar("b", None, 4.0)]),
        );

        let mut assembler = assembler(false);
        assembler.ingest(&family).unwrap();

        let tables = assembler.finish();
        assert_eq!(tables.len(), 1);

        let table = &tables[0];
        assert_eq!(table.key(), "requests_total");
        let names = table.columns().iter().map(Column::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["time", "label", "value"]);
        assert_eq!(table.columns()[VALUE_COLUMN].field_type(), FieldType::of(ItemType::Float64).nullable());
        assert_eq!(labels(table), vec!["host=a", "host=b"]);
        assert_eq!(table.columns()[TIME_COLUMN].get(0), Some(Cell::Time(ts(0))));
        assert_eq!(table.columns()[TIME_COLUMN].get(1), Some(Cell::Time(ts(100))));
        assert_eq!(table.columns()[VALUE_COLUMN].get(1), Some(Cell::Float64(4.0)));
    }

    #[test]
    fn summary_rows_per_quantile() {
        let family = MetricFamily::new(
            "rpc_duration_seconds",
            FamilySamples::Summary(vec![SummarySample {
                labels: TagSet::from_iter([("service", "api")]),
                timestamp: Some(ts(0)),
                sample_count: 10,
                sample_sum: 4.2,
                quantiles: vec![
                    Quantile {
                        quantile: 0.5,
                        value: 0.2,
                    },
                    Quantile {
                        quantile: 0.99,
                        value: 0.9,
                    },
                ],
            }]),
        );

        let mut assembler = assembler(false);
        assembler.ingest(&family).unwrap();

        let tables = assembler.finish();
        let table = &tables[0];
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            labels(table),
            vec!["quantile=0.500000, service=api", "quantile=0.990000, service=api"]
        );
        assert_eq!(table.columns()[VALUE_COLUMN].get(1), Some(Cell::Float64(0.9)));
    }

    fn histogram() -> MetricFamily {
        MetricFamily::new(
            "latency_seconds",
            FamilySamples::Histogram(vec![HistogramSample {
                labels: TagSet::new(),
                timestamp: None,
                sample_count: 7,
                sample_sum: 1.5,
                buckets: vec![
                    Bucket {
                        upper_bound: 0.1,
                        cumulative_count: 2,
                    },
                    Bucket {
                        upper_bound: 1.0,
                        cumulative_count: 6,
                    },
                    Bucket {
                        upper_bound: f64::INFINITY,
                        cumulative_count: 7,
                    },
                ],
            }]),
        )
    }

    #[test]
    fn histogram_rows_per_bucket() {
        let mut assembler = assembler(false);
        assembler.ingest(&histogram()).unwrap();

        let tables = assembler.finish();
        let table = &tables[0];
        assert_eq!(table.columns()[VALUE_COLUMN].field_type(), FieldType::of(ItemType::Uint64).nullable());
        assert_eq!(labels(table), vec!["le=0.100000", "le=1.000000", "le=+Inf"]);
        assert_eq!(table.columns()[VALUE_COLUMN].get(2), Some(Cell::Uint64(7)));
        assert_eq!(table.columns()[TIME_COLUMN].get(2), Some(Cell::Time(ts(100))));
    }

    #[test]
    fn unified_histogram_counts_are_floats() {
        let mut assembler = assembler(true);
        assembler.ingest(&histogram()).unwrap();

        let tables = assembler.finish();
        let value = &tables[0].columns()[VALUE_COLUMN];
        assert_eq!(value.field_type(), FieldType::of(ItemType::Float64).nullable());
        assert_eq!(value.get(0), Some(Cell::Float64(2.0)));
    }

    #[test]
    fn families_with_the_same_name_are_merged() {
        let mut assembler = assembler(false);
        let first = MetricFamily::new("up", FamilySamples::Gauge(vec![scalar("a", None, 1.0)]));
        let second = MetricFamily::new("up", FamilySamples::Gauge(vec![scalar("b", None, 0.0)]));
        assembler.ingest(&first).unwrap();
        assembler.ingest(&second).unwrap();

        let tables = assembler.finish();
        assert_eq!(tables.len(), 1);
        assert_eq!(labels(&tables[0]), vec!["host=a", "host=b"]);
    }

    #[test]
    fn mismatched_merge_is_rejected_without_trace() {
        let mut assembler = assembler(false);
        assembler.ingest(&histogram()).unwrap();

        let gauge = MetricFamily::new("latency_seconds", FamilySamples::Gauge(vec![scalar("a", None, 0.5)]));
        assert!(matches!(
            assembler.ingest(&gauge),
            Err(ConversionError::ValueConversionFailed { .. })
        ));

        let tables = assembler.finish();
        assert_eq!(tables[0].row_count(), 3);
    }

    #[test]
    fn empty_family_still_gets_a_table() {
        let mut assembler = assembler(false);
        assembler
            .ingest(&MetricFamily::new("idle", FamilySamples::Untyped(Vec::new())))
            .unwrap();

        let tables = assembler.finish();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns().len(), 3);
        assert_eq!(tables[0].row_count(), 0);
    }

    #[test]
    fn synthetic_bound_replaces_existing_label() {
        let family = MetricFamily::new(
            "latency_seconds",
            FamilySamples::Histogram(vec![HistogramSample {
                labels: TagSet::from_iter([("le", "stale"), ("path", "/")]),
                timestamp: None,
                sample_count: 1,
                sample_sum: 0.05,
                buckets: vec![Bucket {
                    upper_bound: 0.1,
                    cumulative_count: 1,
                }],
            }]),
        );

        let mut assembler = assembler(false);
        assembler.ingest(&family).unwrap();

        let tables = assembler.finish();
        assert_eq!(labels(&tables[0]), vec!["le=0.100000, path=/"]);
    }

    #[test]
    fn non_finite_quantiles_survive_serialization() {
        let family = MetricFamily::new(
            "rpc_duration_seconds",
            FamilySamples::Summary(vec![SummarySample {
                labels: TagSet::new(),
                timestamp: Some(ts(0)),
                sample_count: 0,
                sample_sum: 0.0,
                quantiles: vec![
                    Quantile {
                        quantile: 0.5,
                        value: f64::NAN,
                    },
                    Quantile {
                        quantile: 0.9,
                        value: f64::INFINITY,
                    },
                ],
            }]),
        );

        let mut assembler = assembler(false);
        assembler.ingest(&family).unwrap();

        let tables = assembler.finish();
        let json = tables[0].to_json().unwrap();
        assert!(json.ends_with(r#"{"name":"value","type":"float64","nullable":true,"values":["NaN","+Inf"]}]}"#));
    }

    #[test]
    fn bound_formatting() {
        assert_eq!(format_bound(0.25), "0.250000");
        assert_eq!(format_bound(10.0), "10.000000");
        assert_eq!(format_bound(f64::INFINITY), "+Inf");
        assert_eq!(format_bound(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_bound(f64::NAN), "NaN");
    }
}
