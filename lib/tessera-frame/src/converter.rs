use std::sync::Arc;

use tessera_measurement::{Measurement, MetricFamily, Timestamp};
use tracing::{debug, warn};

use crate::{
    assembler::{FixedSchemaAssembler, FrameAssembler, LabelColumnAssembler, WideColumnAssembler},
    coercion::{Coercer, ConverterRegistry},
    config::{ConverterConfiguration, ErrorPolicy, Layout},
    ConversionError, Table,
};

/// Converts batches of measurements, or metric families, into tables.
///
/// A converter only holds its configuration and converter registry. Every call builds its tables from scratch and
/// hands all of them back, so nothing carries over from one call to the next, and a single converter can be shared
/// freely across threads.
#[derive(Clone, Debug)]
pub struct Converter {
    config: ConverterConfiguration,
    registry: Arc<ConverterRegistry>,
}

impl Converter {
    /// Creates a new `Converter` with the default converter registry.
    pub fn new(config: ConverterConfiguration) -> Self {
        Self::with_registry(config, ConverterRegistry::with_defaults())
    }

    /// Creates a new `Converter` with the given converter registry.
    pub fn with_registry(config: ConverterConfiguration, registry: ConverterRegistry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ConverterConfiguration {
        &self.config
    }

    /// Converts a batch of measurements into tables.
    ///
    /// Tables are returned in the order their keys were first seen.
    ///
    /// # Errors
    ///
    /// If a measurement cannot be converted and the error policy is [`ErrorPolicy::Abort`], an error is returned and no
    /// tables are produced.
    pub fn convert<'a, I>(&self, measurements: I) -> Result<Vec<Table>, ConversionError>
    where
        I: IntoIterator<Item = &'a Measurement>,
    {
        let coercer = self.coercer();
        let grouping = self.config.grouping();
        match self.config.layout() {
            Layout::Wide => run(
                WideColumnAssembler::new(coercer, grouping),
                measurements,
                self.config.error_policy(),
            ),
            Layout::Labels => run(
                LabelColumnAssembler::new(coercer, grouping),
                measurements,
                self.config.error_policy(),
            ),
        }
    }

    /// Converts a batch of metric families into fixed-schema tables.
    ///
    /// Samples without an explicit timestamp are stamped with the current time, read once for the whole batch.
    ///
    /// # Errors
    ///
    /// If a family cannot be converted and the error policy is [`ErrorPolicy::Abort`], an error is returned and no
    /// tables are produced.
    pub fn convert_families<'a, I>(&self, families: I) -> Result<Vec<Table>, ConversionError>
    where
        I: IntoIterator<Item = &'a MetricFamily>,
    {
        self.convert_families_at(families, chrono::Utc::now())
    }

    /// Converts a batch of metric families into fixed-schema tables, stamping samples that lack an explicit timestamp
    /// with `observed_at`.
    ///
    /// # Errors
    ///
    /// If a family cannot be converted and the error policy is [`ErrorPolicy::Abort`], an error is returned and no
    /// tables are produced.
    pub fn convert_families_at<'a, I>(&self, families: I, observed_at: Timestamp) -> Result<Vec<Table>, ConversionError>
    where
        I: IntoIterator<Item = &'a MetricFamily>,
    {
        run(
            FixedSchemaAssembler::new(self.coercer(), observed_at),
            families,
            self.config.error_policy(),
        )
    }

    fn coercer(&self) -> Coercer {
        Coercer::new(Arc::clone(&self.registry), self.config.unify_numeric())
    }
}

fn run<'a, A, I>(mut assembler: A, inputs: I, error_policy: ErrorPolicy) -> Result<Vec<Table>, ConversionError>
where
    A: FrameAssembler,
    A::Input: 'a,
    I: IntoIterator<Item = &'a A::Input>,
{
    let mut ingested = 0;
    let mut skipped = 0;
    for input in inputs {
        match assembler.ingest(input) {
            Ok(()) => ingested += 1,
            Err(e) => match error_policy {
                ErrorPolicy::Abort => return Err(e),
                ErrorPolicy::Skip => {
                    warn!(error = %e, "Skipping input which could not be converted.");
                    skipped += 1;
                }
            },
        }
    }

    let tables = assembler.finish();
    debug!(ingested, skipped, tables = tables.len(), "Finished conversion.");

    Ok(tables)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use proptest::prelude::*;
    use similar_asserts::assert_eq;
    use tessera_measurement::{FamilySamples, FieldValue, ScalarSample, TagSet};

    use super::*;
    use crate::{Cell, GroupingMode, ItemType};

    fn ts(secs: i64) -> Timestamp {
        chrono::Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn cpu(host: &str, secs: i64, usage: f64) -> Measurement {
        Measurement::new("cpu", ts(secs))
            .with_tag("host", host)
            .with_field("usage", usage)
    }

    fn to_json(tables: &[Table]) -> Vec<String> {
        tables.iter().map(|table| table.to_json().unwrap()).collect()
    }

    fn bad_measurement() -> Measurement {
        Measurement::new("disk", ts(5))
            .with_tag("device", "sda")
            .with_field("raw", FieldValue::Bytes(vec![0xff]))
    }

    #[test]
    fn default_configuration_builds_wide_tables() {
        let converter = Converter::new(ConverterConfiguration::default());
        let batch = vec![cpu("a", 0, 1.0), cpu("b", 0, 2.0)];

        let tables = converter.convert(&batch).unwrap();
        assert_eq!(
            to_json(&tables),
            vec![concat!(
                r#"{"name":"cpu","fields":["#,
                r#"{"name":"time","type":"time","nullable":false,"values":["2023-11-14T22:13:20Z"]},"#,
                r#"{"name":"usage","type":"float64","nullable":true,"labels":{"host":"a"},"values":[1.0]},"#,
                r#"{"name":"usage","type":"float64","nullable":true,"labels":{"host":"b"},"values":[2.0]}"#,
                r#"]}"#
            )
            .to_string()]
        );
    }

    #[test]
    fn label_layout() {
        let config = ConverterConfiguration::default().with_layout(Layout::Labels);
        let converter = Converter::new(config);
        let batch = vec![cpu("a", 0, 1.0), cpu("b", 0, 2.0)];

        let tables = converter.convert(&batch).unwrap();
        assert_eq!(
            to_json(&tables),
            vec![concat!(
                r#"{"name":"cpu","fields":["#,
                r#"{"name":"time","type":"time","nullable":false,"#,
                r#""values":["2023-11-14T22:13:20Z","2023-11-14T22:13:20Z"]},"#,
                r#"{"name":"labels","type":"string","nullable":false,"values":["host=a","host=b"]},"#,
                r#"{"name":"usage","type":"float64","nullable":true,"values":[1.0,2.0]}"#,
                r#"]}"#
            )
            .to_string()]
        );
    }

    #[test]
    fn abort_policy_produces_no_tables() {
        let converter = Converter::new(ConverterConfiguration::default());
        let batch = vec![cpu("a", 0, 1.0), bad_measurement(), cpu("a", 10, 2.0)];

        let err = converter.convert(&batch).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownValueType { ref field, .. } if field == "raw"));
    }

    #[test]
    fn skip_policy_drops_only_the_bad_measurement() {
        let config = ConverterConfiguration::default().with_error_policy(ErrorPolicy::Skip);
        let converter = Converter::new(config);
        let batch = vec![cpu("a", 0, 1.0), bad_measurement(), cpu("a", 10, 2.0)];

        let tables = converter.convert(&batch).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].key(), "cpu");
        assert_eq!(tables[0].row_count(), 2);

        let clean = converter.convert(&[cpu("a", 0, 1.0), cpu("a", 10, 2.0)]).unwrap();
        assert_eq!(to_json(&tables), to_json(&clean));
    }

    #[test]
    fn calls_do_not_share_state() {
        let converter = Converter::new(ConverterConfiguration::default());

        let first = converter.convert(&[cpu("a", 0, 1.0)]).unwrap();
        let second = converter.convert(&[cpu("b", 10, 2.0)]).unwrap();
        assert_eq!(second[0].columns().len(), 2);
        assert_eq!(second[0].row_count(), 1);
        assert_eq!(first[0].row_count(), 1);
    }

    #[test]
    fn custom_registry() {
        let mut registry = ConverterRegistry::with_defaults();
        registry.unregister(ItemType::Float64);
        let converter = Converter::with_registry(ConverterConfiguration::default().with_unify_numeric(true), registry);

        let err = converter
            .convert(&[Measurement::new("events", ts(0)).with_field("count", 7i64)])
            .unwrap_err();
        assert!(matches!(err, ConversionError::NoConverterForType { .. }));
    }

    #[test]
    fn grouping_by_name_and_time() {
        let config = ConverterConfiguration::default().with_grouping(GroupingMode::ByNameAndTime);
        let converter = Converter::new(config);

        let tables = converter
            .convert(&[cpu("a", 0, 1.0), cpu("a", 10, 2.0), cpu("b", 0, 3.0)])
            .unwrap();
        let keys = tables.iter().map(Table::key).collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec!["cpu@2023-11-14T22:13:20+00:00", "cpu@2023-11-14T22:13:30+00:00"]
        );
        assert_eq!(tables[0].columns().len(), 3);
    }

    #[test]
    fn families_share_one_observation_time() {
        let converter = Converter::new(ConverterConfiguration::default());
        let samples = |host: &str| ScalarSample {
            labels: TagSet::from_iter([("host", host)]),
            timestamp: None,
            value: 1.0,
        };
        let families = vec![
            MetricFamily::new("up", FamilySamples::Gauge(vec![samples("a")])),
            MetricFamily::new("scrapes_total", FamilySamples::Counter(vec![samples("b")])),
        ];

        let tables = converter.convert_families(&families).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].columns()[0].get(0), tables[1].columns()[0].get(0));

        let tables = converter.convert_families_at(&families, ts(0)).unwrap();
        assert_eq!(tables[1].columns()[0].get(0), Some(Cell::Time(ts(0))));
    }

    fn arb_measurement() -> impl Strategy<Value = Measurement> {
        (
            prop::sample::select(vec!["cpu", "mem", "disk"]),
            prop::sample::select(vec!["a", "b"]),
            0i64..4,
            prop_oneof![
                any::<i64>().prop_map(FieldValue::I64),
                any::<u32>().prop_map(FieldValue::U32),
                (-1e6f64..1e6).prop_map(FieldValue::F64),
                any::<bool>().prop_map(FieldValue::Bool),
            ],
        )
            .prop_map(|(name, host, secs, value)| {
                Measurement::new(name, ts(secs))
                    .with_tag("host", host)
                    .with_field("value", value)
            })
    }

    fn arb_config() -> impl Strategy<Value = ConverterConfiguration> {
        (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(by_time, labels, unify)| {
            ConverterConfiguration::default()
                .with_grouping(if by_time {
                    GroupingMode::ByNameAndTime
                } else {
                    GroupingMode::ByName
                })
                .with_layout(if labels { Layout::Labels } else { Layout::Wide })
                .with_unify_numeric(unify)
                .with_error_policy(ErrorPolicy::Skip)
        })
    }

    proptest! {
        #[test]
        fn property_test_conversion_is_deterministic(
            config in arb_config(),
            batch in prop::collection::vec(arb_measurement(), 0..30),
        ) {
            let converter = Converter::new(config);
            let first = converter.convert(&batch).unwrap();
            let second = converter.convert(&batch).unwrap();
            prop_assert_eq!(to_json(&first), to_json(&second));
        }

        #[test]
        fn property_test_columns_are_aligned(
            config in arb_config(),
            batch in prop::collection::vec(arb_measurement(), 0..30),
        ) {
            let converter = Converter::new(config);
            for table in converter.convert(&batch).unwrap() {
                for column in table.columns() {
                    prop_assert_eq!(column.len(), table.row_count());
                    let structural = column.name() == "time" || column.name() == "labels";
                    prop_assert!(structural || column.field_type().is_nullable());
                }
            }
        }
    }
}
