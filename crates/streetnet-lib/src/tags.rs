//! Key/value annotations carried by raw nodes, raw ways, and connection infos.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Road classification key; its value gates route eligibility.
pub const HIGHWAY: &str = "highway";
/// Direction restriction key.
pub const ONEWAY: &str = "oneway";
/// Junction kind key (`roundabout` implies one-way traversal).
pub const JUNCTION: &str = "junction";
/// Explicit speed limit key.
pub const MAXSPEED: &str = "maxspeed";

/// Set of string tags with unique keys.
///
/// Backed by an ordered map so that value-equal tag sets compare, hash, and
/// serialize identically regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet {
    tags: BTreeMap<String, String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag, replacing and returning any previous value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.tags.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Look up `key`, falling back to `default` when the tag is absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Road classification (`highway` value), if tagged.
    pub fn classification(&self) -> Option<&str> {
        self.get(HIGHWAY)
    }

    /// Whether traffic may only follow the node order of the tagged way.
    pub fn is_one_way(&self) -> bool {
        self.get(ONEWAY) == Some("yes") || self.get(JUNCTION) == Some("roundabout")
    }
}

impl<K, V> FromIterator<(K, V)> for TagSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}
