//! Ordered route parameters
//!
//! Parameters keep the order in which they were declared in the pattern,
//! so `/users/[id]/posts/[slug]` always yields `id` before `slug`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Insertion-ordered map of parameter name → captured value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteParams(IndexMap<String, String>);

impl RouteParams {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Inserts a parameter, keeping its original position if it already exists
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parameter names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Stable `name=value&...` form used in cache keys
    ///
    /// Both sides are percent-encoded so values containing `&` or `=`
    /// can never produce the same key as a different parameter set.
    pub fn serialize_key(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K, V> FromIterator<(K, V)> for RouteParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
