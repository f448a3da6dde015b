use indexmap::IndexMap;
use serde::Deserialize;
use snafu::Snafu;
use tessera_common::hash::{fingerprint, Fingerprint};

use crate::{FieldValue, TagSet, Timestamp};

/// A measurement error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum MeasurementError {
    /// The measurement carried no fields.
    #[snafu(display("Measurement '{}' has no fields; at least one field is required.", name))]
    NoFields {
        /// Name of the offending measurement.
        name: String,
    },
}

/// A single decoded sample: a name, a set of tags, a timestamp, and one or more fields.
///
/// The name and tags together identify a series (see [`fingerprint`][Measurement::fingerprint]). Fields hold the
/// observed values, each under its own key, and are kept in the order the decoder produced them. Field keys are not
/// required to be unique.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(try_from = "RawMeasurement")]
pub struct Measurement {
    name: String,
    tags: TagSet,
    timestamp: Timestamp,
    fields: Vec<(String, FieldValue)>,
}

impl Measurement {
    /// Creates a new `Measurement` with the given name and timestamp, and no tags or fields.
    ///
    /// At least one field must be added before the measurement is handed to a converter.
    pub fn new<N>(name: N, timestamp: Timestamp) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            tags: TagSet::new(),
            timestamp,
            fields: Vec::new(),
        }
    }

    /// Adds a tag.
    pub fn with_tag<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags.insert(key, value);
        self
    }

    /// Replaces the tags.
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    /// Adds a field.
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Returns the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tags.
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Returns the timestamp.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Returns the fields, in decoder order.
    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    /// Returns the fields sorted by key.
    ///
    /// The sort is stable, so repeated keys keep their relative decoder order.
    pub fn sorted_fields(&self) -> Vec<(&str, &FieldValue)> {
        let mut fields = self.fields.iter().map(|(k, v)| (k.as_str(), v)).collect::<Vec<_>>();
        fields.sort_by(|(a, _), (b, _)| a.cmp(b));
        fields
    }

    /// Returns the fingerprint of the series this measurement belongs to.
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.name, self.tags.iter())
    }
}

#[derive(Deserialize)]
struct RawMeasurement {
    name: String,
    #[serde(default)]
    tags: TagSet,
    timestamp: Timestamp,
    fields: IndexMap<String, FieldValue>,
}

impl TryFrom<RawMeasurement> for Measurement {
    type Error = MeasurementError;

    fn try_from(raw: RawMeasurement) -> Result<Self, Self::Error> {
        if raw.fields.is_empty() {
            return Err(MeasurementError::NoFields { name: raw.name });
        }

        Ok(Self {
            name: raw.name,
            tags: raw.tags,
            timestamp: raw.timestamp,
            fields: raw.fields.into_iter().collect(),
        })
    }
}
