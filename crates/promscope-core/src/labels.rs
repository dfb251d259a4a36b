//! Label sets and name validation.
//!
//! A `LabelSet` is kept as a key-sorted vector of pairs so that two sets with
//! the same content compare, hash and render identically regardless of the
//! order the caller supplied them in.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{MetricsError, Result};

/// Label reserved for histogram bucket upper bounds.
pub const BUCKET_LABEL: &str = "le";

/// Canonical (key-sorted, key-unique) label set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelSet {
    pairs: Vec<(String, String)>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from borrowed pairs. A key given twice keeps its last value.
    pub fn from_pairs<K, V>(pairs: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        pairs
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_ref()))
            .collect()
    }

    /// Insert or replace one label.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.binary_search_by(|(k, _)| k.as_str().cmp(&key)) {
            Ok(i) => self.pairs[i].1 = value,
            Err(i) => self.pairs.insert(i, (key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|i| self.pairs[i].1.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Same keys, every value replaced by `value`.
    pub fn fold_values(&self, value: &str) -> LabelSet {
        LabelSet {
            pairs: self
                .pairs
                .iter()
                .map(|(k, _)| (k.clone(), value.to_string()))
                .collect(),
        }
    }

    /// Reject malformed label names and any name in `reserved`.
    pub fn validate(&self, reserved: &[&str]) -> Result<()> {
        for (k, _) in &self.pairs {
            if !is_valid_label_name(k) {
                return Err(MetricsError::InvalidLabel(format!("bad label name: {k:?}")));
            }
            if k.starts_with("__") || reserved.contains(&k.as_str()) {
                return Err(MetricsError::InvalidLabel(format!("reserved label name: {k}")));
            }
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for LabelSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map: BTreeMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        LabelSet {
            pairs: map.into_iter().collect(),
        }
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v:?}")?;
        }
        f.write_str("}")
    }
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
