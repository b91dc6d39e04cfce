//! Credential material and constant-time comparison.

use std::sync::atomic::{Ordering, compiler_fence};

use serde::{Deserialize, Deserializer};

/// A password held in memory as raw bytes.
///
/// `Debug` output is redacted and the buffer is zeroed on drop. There is no
/// `PartialEq`: the only way to compare a secret is [`Secret::matches`], which
/// runs in constant time.
#[derive(Clone, Default)]
pub struct Secret(Vec<u8>);

impl Secret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Constant-time comparison against supplied credential bytes.
    pub fn matches(&self, supplied: &[u8]) -> bool {
        constant_time_eq(&self.0, supplied)
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Debug for Secret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.fill(0);
        compiler_fence(Ordering::SeqCst);
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Secret {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Secret::from)
    }
}

/// Compare two byte strings without short-circuiting.
///
/// Every byte of the longer input is visited and a length mismatch is folded
/// into the accumulator instead of returning early, so the running time only
/// depends on the input lengths.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut diff = a.len() ^ b.len();

    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }

    std::hint::black_box(diff) == 0
}
