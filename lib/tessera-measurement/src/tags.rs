use std::{collections::BTreeMap, fmt};

use serde::{ser::SerializeMap as _, Deserialize, Serialize, Serializer};

/// A set of key/value tags.
///
/// Tags are kept sorted by key, and each key appears at most once: inserting a key that already exists replaces its
/// value. Because the order is canonical, two tag sets holding the same pairs compare equal, iterate identically, and
/// render to the same string no matter what order their tags were inserted in.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq)]
#[serde(from = "BTreeMap<String, String>")]
pub struct TagSet(Vec<(String, String)>);

impl TagSet {
    /// Creates an empty `TagSet`.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns `true` if there are no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Inserts a tag, replacing the value of an existing tag with the same key.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        let value = value.into();
        match self.0.binary_search_by(|(existing, _)| existing.as_str().cmp(key.as_str())) {
            Ok(idx) => self.0[idx].1 = value,
            Err(idx) => self.0.insert(idx, (key, value)),
        }
    }

    /// Returns a copy of this tag set with the given tag added.
    pub fn with_tag<K, V>(&self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut tags = self.clone();
        tags.insert(key, value);
        tags
    }

    /// Gets the value of the tag with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .binary_search_by(|(existing, _)| existing.as_str().cmp(key))
            .ok()
            .map(|idx| self.0[idx].1.as_str())
    }

    /// Iterates over the tags, in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Renders the tags as `key=value` pairs, in key order, separated by `", "`.
impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut needs_separator = false;
        for (key, value) in &self.0 {
            if needs_separator {
                write!(f, ", ")?;
            } else {
                needs_separator = true;
            }

            write!(f, "{}={}", key, value)?;
        }

        Ok(())
    }
}

impl Serialize for TagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<K, V> FromIterator<(K, V)> for TagSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = Self::new();
        for (key, value) in iter {
            tags.insert(key, value);
        }
        tags
    }
}

impl From<BTreeMap<String, String>> for TagSet {
    fn from(tags: BTreeMap<String, String>) -> Self {
        // Already sorted and de-duplicated.
        Self(tags.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn insert_keeps_keys_sorted_and_unique() {
        let mut tags = TagSet::new();
        tags.insert("zone", "us-east");
        tags.insert("host", "a");
        tags.insert("env", "prod");
        tags.insert("host", "b");

        let pairs = tags.iter().collect::<Vec<_>>();
        assert_eq!(pairs, vec![("env", "prod"), ("host", "b"), ("zone", "us-east")]);
        assert_eq!(tags.get("host"), Some("b"));
        assert_eq!(tags.get("missing"), None);
    }

    #[test]
    fn display_renders_sorted_pairs() {
        let tags = TagSet::from_iter([("job", "node"), ("instance", "localhost:9100")]);
        assert_eq!(tags.to_string(), "instance=localhost:9100, job=node");
        assert_eq!(TagSet::new().to_string(), "");
    }

    #[test]
    fn with_tag_leaves_source_untouched() {
        let tags = TagSet::from_iter([("method", "GET")]);
        let extended = tags.with_tag("le", "0.500000");

        assert_eq!(tags.len(), 1);
        assert_eq!(extended.to_string(), "le=0.500000, method=GET");
    }

    #[test]
    fn deserializes_from_map() {
        let tags: TagSet = serde_json::from_str(r#"{"b": "2", "a": "1"}"#).unwrap();
        assert_eq!(tags.to_string(), "a=1, b=2");
        assert_eq!(serde_json::to_string(&tags).unwrap(), r#"{"a":"1","b":"2"}"#);
    }

    proptest! {
        #[test]
        fn property_test_insertion_order_irrelevant(
            pairs in proptest::collection::btree_map("[a-z]{1,5}", "[a-z0-9]{0,5}", 0..10),
        ) {
            let forward = pairs.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<TagSet>();
            let backward = pairs.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect::<TagSet>();

            prop_assert_eq!(&forward, &backward);
            prop_assert_eq!(forward.to_string(), backward.to_string());
        }
    }
}
