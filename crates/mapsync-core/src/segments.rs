//! Insertion-ordered segment map mirroring the persisted URL fragment

use serde::{Deserialize, Serialize};

/// Well-known segment keys. They form the deep-link wire format, so renaming
/// any of them breaks links that are already shared.
pub mod keys {
    pub const QUERY: &str = "query";
    pub const FROM: &str = "from";
    pub const TO: &str = "to";
    pub const AT: &str = "at";
    pub const LAYER: &str = "layer";
    pub const PLACES: &str = "places";
    pub const FILTERS: &str = "f";
    pub const EXPLORATION: &str = "ex";
    pub const BBOX: &str = "bbox";
}

/// Mutable key/value state behind the fragment.
///
/// Iteration follows insertion order. Overwriting a key keeps its slot; a key
/// that was removed and set again moves to the end. An absent key and a key
/// holding an empty string are different states.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentMap {
    entries: Vec<(String, String)>,
}

impl SegmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, returning the previous value if there was one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Remove `key`, returning its value if it was present
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(key, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SegmentMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = SegmentMap::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}
