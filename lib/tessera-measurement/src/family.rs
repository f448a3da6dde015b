use std::fmt;

use serde::Deserialize;
use snafu::{OptionExt as _, Snafu};

use crate::{TagSet, Timestamp};

/// A metric family error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum MetricFamilyError {
    /// A counter, gauge, or untyped sample carried no value.
    #[snafu(display("Sample of family '{}' is missing 'value'.", family))]
    MissingValue {
        /// Name of the offending family.
        family: String,
    },

    /// A summary sample carried no quantiles.
    #[snafu(display("Sample of summary family '{}' is missing 'quantiles'.", family))]
    MissingQuantiles {
        /// Name of the offending family.
        family: String,
    },

    /// A histogram sample carried no buckets.
    #[snafu(display("Sample of histogram family '{}' is missing 'buckets'.", family))]
    MissingBuckets {
        /// Name of the offending family.
        family: String,
    },
}

/// The kind of a metric family.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// A monotonically increasing value.
    Counter,

    /// A point-in-time value.
    Gauge,

    /// Pre-computed quantiles over a distribution.
    Summary,

    /// Cumulative bucket counts over a distribution.
    Histogram,

    /// A value of unknown semantics, handled like a gauge.
    Untyped,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Summary => "summary",
            Self::Histogram => "histogram",
            Self::Untyped => "untyped",
        };
        f.write_str(s)
    }
}

/// A scalar sample, as carried by counters, gauges, and untyped metrics.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ScalarSample {
    /// Labels of the sample.
    #[serde(default)]
    pub labels: TagSet,

    /// Explicit timestamp of the sample, if the exposition carried one.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,

    /// Sampled value.
    pub value: f64,
}

/// A single quantile of a summary.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct Quantile {
    /// Quantile rank, between 0.0 and 1.0.
    pub quantile: f64,

    /// Value at that rank.
    pub value: f64,
}

/// A summary sample.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SummarySample {
    /// Labels of the sample.
    #[serde(default)]
    pub labels: TagSet,

    /// Explicit timestamp of the sample, if the exposition carried one.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,

    /// Total number of observations.
    #[serde(default)]
    pub sample_count: u64,

    /// Sum of all observations.
    #[serde(default)]
    pub sample_sum: f64,

    /// Computed quantiles.
    pub quantiles: Vec<Quantile>,
}

/// A single cumulative bucket of a histogram.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct Bucket {
    /// Inclusive upper bound of the bucket.
    pub upper_bound: f64,

    /// Number of observations less than or equal to the upper bound.
    pub cumulative_count: u64,
}

/// A histogram sample.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HistogramSample {
    /// Labels of the sample.
    #[serde(default)]
    pub labels: TagSet,

    /// Explicit timestamp of the sample, if the exposition carried one.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,

    /// Total number of observations.
    #[serde(default)]
    pub sample_count: u64,

    /// Sum of all observations.
    #[serde(default)]
    pub sample_sum: f64,

    /// Cumulative buckets, in ascending order of upper bound.
    pub buckets: Vec<Bucket>,
}

/// The samples of a metric family, typed by the family's kind.
#[derive(Clone, Debug, PartialEq)]
pub enum FamilySamples {
    /// Counter samples.
    Counter(Vec<ScalarSample>),

    /// Gauge samples.
    Gauge(Vec<ScalarSample>),

    /// Summary samples.
    Summary(Vec<SummarySample>),

    /// Histogram samples.
    Histogram(Vec<HistogramSample>),

    /// Untyped samples.
    Untyped(Vec<ScalarSample>),
}

/// A named group of samples sharing one metric kind.
///
/// This is the unit that exposition formats are organized around: every sample of `http_requests_total` is part of the
/// same family, and differs from its siblings only by labels (and, optionally, timestamp).
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(try_from = "RawMetricFamily")]
pub struct MetricFamily {
    name: String,
    help: Option<String>,
    samples: FamilySamples,
}

impl MetricFamily {
    /// Creates a new `MetricFamily`.
    pub fn new<N>(name: N, samples: FamilySamples) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            help: None,
            samples,
        }
    }

    /// Sets the help text.
    pub fn with_help<H>(mut self, help: H) -> Self
    where
        H: Into<String>,
    {
        self.help = Some(help.into());
        self
    }

    /// Returns the family name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Returns the kind of this family.
    pub fn kind(&self) -> MetricKind {
        match &self.samples {
            FamilySamples::Counter(_) => MetricKind::Counter,
            FamilySamples::Gauge(_) => MetricKind::Gauge,
            FamilySamples::Summary(_) => MetricKind::Summary,
            FamilySamples::Histogram(_) => MetricKind::Histogram,
            FamilySamples::Untyped(_) => MetricKind::Untyped,
        }
    }

    /// Returns the samples.
    pub fn samples(&self) -> &FamilySamples {
        &self.samples
    }
}

#[derive(Deserialize)]
struct RawMetricFamily {
    name: String,
    #[serde(default)]
    help: Option<String>,
    #[serde(rename = "type")]
    kind: MetricKind,
    #[serde(default)]
    samples: Vec<RawSample>,
}

/// Superset of every sample shape; which fields must be present depends on the family kind.
#[derive(Deserialize)]
struct RawSample {
    #[serde(default)]
    labels: TagSet,
    #[serde(default)]
    timestamp: Option<Timestamp>,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    sample_count: u64,
    #[serde(default)]
    sample_sum: f64,
    #[serde(default)]
    quantiles: Option<Vec<Quantile>>,
    #[serde(default)]
    buckets: Option<Vec<Bucket>>,
}

impl RawSample {
    fn into_scalar(self, family: &str) -> Result<ScalarSample, MetricFamilyError> {
        let value = self.value.context(MissingValue { family })?;
        Ok(ScalarSample {
            labels: self.labels,
            timestamp: self.timestamp,
            value,
        })
    }

    fn into_summary(self, family: &str) -> Result<SummarySample, MetricFamilyError> {
        let quantiles = self.quantiles.context(MissingQuantiles { family })?;
        Ok(SummarySample {
            labels: self.labels,
            timestamp: self.timestamp,
            sample_count: self.sample_count,
            sample_sum: self.sample_sum,
            quantiles,
        })
    }

    fn into_histogram(self, family: &str) -> Result<HistogramSample, MetricFamilyError> {
        let buckets = self.buckets.context(MissingBuckets { family })?;
        Ok(HistogramSample {
            labels: self.labels,
            timestamp: self.timestamp,
            sample_count: self.sample_count,
            sample_sum: self.sample_sum,
            buckets,
        })
    }
}

impl TryFrom<RawMetricFamily> for MetricFamily {
    type Error = MetricFamilyError;

    fn try_from(raw: RawMetricFamily) -> Result<Self, Self::Error> {
        let name = raw.name;
        let samples = raw.samples.into_iter();
        let samples = match raw.kind {
            MetricKind::Counter => {
                FamilySamples::Counter(samples.map(|s| s.into_scalar(&name)).collect::<Result<_, _>>()?)
            }
            MetricKind::Gauge => {
                FamilySamples::Gauge(samples.map(|s| s.into_scalar(&name)).collect::<Result<_, _>>()?)
            }
            MetricKind::Untyped => {
                FamilySamples::Untyped(samples.map(|s| s.into_scalar(&name)).collect::<Result<_, _>>()?)
            }
            MetricKind::Summary => {
                FamilySamples::Summary(samples.map(|s| s.into_summary(&name)).collect::<Result<_, _>>()?)
            }
            MetricKind::Histogram => {
                FamilySamples::Histogram(samples.map(|s| s.into_histogram(&name)).collect::<Result<_, _>>()?)
            }
        };

        Ok(Self {
            name,
            help: raw.help,
            samples,
        })
    }
}
