//! Hash-based collection aliases.

use crate::hash::{FastBuildHasher, NoopU64BuildHasher};

/// A hash map based on `hashbrown` ([`HashMap`][hashbrown::HashMap]) using [`FastBuildHasher`][crate::hash::FastBuildHasher].
pub type FastHashMap<K, V> = hashbrown::HashMap<K, V, FastBuildHasher>;

/// A hash map with stable insertion order based on `indexmap` ([`IndexMap`][indexmap::IndexMap]) using
/// [`FastBuildHasher`][crate::hash::FastBuildHasher].
///
/// Iteration order is the order in which keys were first inserted, which is what every converter relies on to emit
/// tables in first-seen order.
pub type FastIndexMap<K, V> = indexmap::IndexMap<K, V, FastBuildHasher>;

/// A hash map keyed by values that are already hashes, such as [`Fingerprint`][crate::hash::Fingerprint].
///
/// Uses [`NoopU64Hasher`][crate::hash::NoopU64Hasher], so it is only suitable for `u64` keys or types which wrap a
/// single `u64`.
pub type PrehashedHashMap<K, V> = hashbrown::HashMap<K, V, NoopU64BuildHasher>;
