//! Hashing primitives.

use std::hash::{BuildHasherDefault, Hasher};

/// [`BuildHasher`][std::hash::BuildHasher] for a fast, non-cryptographic hash optimized for quality.
///
/// Currently, [`foldhash`][foldhash] is used as the underlying implementation.
///
/// [foldhash]: http://github.com/orlp/foldhash
pub type FastBuildHasher = foldhash::quality::RandomState;

/// A hasher that passes through a single `u64` unchanged.
///
/// Only meant for keys that are themselves hashes. Writing anything other than a single `u64` folds the bytes in
/// naively, which is correct but defeats the purpose.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopU64Hasher(u64);

impl Hasher for NoopU64Hasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 = self.0.rotate_left(8) ^ u64::from(*byte);
        }
    }

    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }
}

/// [`BuildHasher`][std::hash::BuildHasher] implementation for [`NoopU64Hasher`].
pub type NoopU64BuildHasher = BuildHasherDefault<NoopU64Hasher>;

/// Identity of a series: a measurement name plus its set of tags.
///
/// Two measurements with the same name and the same tag pairs always have the same fingerprint, regardless of the
/// order their tags arrived in. The value is stable across processes and runs.
///
/// Fingerprints are 64-bit FNV-1a hashes and carry no collision resistance beyond that: two distinct series hashing
/// to the same value would be treated as one.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Returns the raw hash value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// Separators keep adjacent strings from bleeding into one another, so that `("ab", "c")` and `("a", "bc")` differ.
const KEY_VALUE_SEPARATOR: u8 = 0x1f;
const PAIR_SEPARATOR: u8 = 0x1e;

/// Computes the fingerprint of a series from its name and tag pairs.
///
/// Tag pairs are sorted by key (and then by value, should a key repeat) before hashing, so the input may be in any
/// order.
pub fn fingerprint<I, K, V>(name: &str, tags: I) -> Fingerprint
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs = tags.into_iter().collect::<Vec<_>>();
    pairs.sort_unstable_by(|(ka, va), (kb, vb)| {
        ka.as_ref()
            .cmp(kb.as_ref())
            .then_with(|| va.as_ref().cmp(vb.as_ref()))
    });

    let mut hasher = fnv::FnvHasher::default();
    hasher.write(name.as_bytes());
    for (key, value) in &pairs {
        hasher.write_u8(PAIR_SEPARATOR);
        hasher.write(key.as_ref().as_bytes());
        hasher.write_u8(KEY_VALUE_SEPARATOR);
        hasher.write(value.as_ref().as_bytes());
    }

    Fingerprint(hasher.finish())
}
