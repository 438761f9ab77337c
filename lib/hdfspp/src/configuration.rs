//! Immutable configuration snapshots.
//!
//! A [`Configuration`] is a plain key/value mapping. It is never
//! patched in place: the loader produces a new snapshot for every
//! overlay, and callers keep whichever snapshot they want.

use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// A resolved configuration. Keys are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    values: Arc<BTreeMap<String, String>>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_map(values: BTreeMap<String, String>) -> Self {
        Self {
            values: Arc::new(values),
        }
    }

    /// Returns a new snapshot with `key` set to `value`.
    pub fn with_value(&self, key: &str, value: impl Into<String>) -> Self {
        let mut values = (*self.values).clone();
        values.insert(fix_case(key), value.into());
        Self::from_map(values)
    }

    /// Returns a new snapshot where every entry of `other` replaces the
    /// entry of the same key in `self`.
    pub fn overlaid_with(&self, other: &Configuration) -> Self {
        let mut values = (*self.values).clone();
        values.extend(other.iter().map(|(k, v)| (k.to_owned(), v.to_owned())));
        Self::from_map(values)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&fix_case(key)).map(String::as_str)
    }

    pub fn get_with_default<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key)?.trim().parse().ok()
    }

    pub fn get_int_with_default(&self, key: &str, default: i64) -> i64 {
        self.get_int(key).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let value = self.get(key)?.trim();
        if value.eq_ignore_ascii_case("true") {
            Some(true)
        } else if value.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }

    pub fn get_bool_with_default(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    pub fn get_uri(&self, key: &str) -> Option<Url> {
        Url::parse(self.get(key)?.trim()).ok()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

pub(crate) fn fix_case(key: &str) -> String {
    key.to_ascii_lowercase()
}
