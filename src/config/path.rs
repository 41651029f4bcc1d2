//! Dotted config keys and traversal of nested JSON mappings
//!
//! A key such as `apple.color` addresses `{"apple": {"color": ...}}`.
//! Only objects are traversable: arrays and scalars met before the final
//! segment are reported as a [`ConfigError::PathConflict`].

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use super::error::{ConfigError, Result};

/// Non-empty sequence of non-empty key segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigPath {
    segments: Vec<String>,
}

impl ConfigPath {
    pub fn parse(key: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(ConfigError::InvalidPath {
                key: key.to_string(),
                reason: "key is empty",
            });
        }
        let segments: Vec<String> = key.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(ConfigError::InvalidPath {
                key: key.to_string(),
                reason: "key contains an empty segment",
            });
        }
        Ok(Self { segments })
    }

    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(ConfigError::InvalidPath {
                key: segments.join("."),
                reason: "path must have at least one non-empty segment",
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false, parsing rejects empty keys
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path with `segment` appended
    pub fn child(&self, segment: &str) -> Result<Self> {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self::from_segments(segments)
    }

    /// True when every segment of `self` leads `other` (segment-wise, so
    /// `apple` is a prefix of `apple.color` but not of `apples`)
    pub fn is_prefix_of(&self, other: &ConfigPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a == b)
    }

    /// Either path is a prefix of the other
    pub fn overlaps(&self, other: &ConfigPath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    fn conflict(&self, depth: usize) -> ConfigError {
        ConfigError::PathConflict {
            key: self.to_string(),
            segment: self.segments[..depth].join("."),
        }
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for ConfigPath {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ConfigPath {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

/// Walk `document` along `path`.
///
/// Absent segments yield `default`; a non-mapping met before the last
/// segment is a conflict. A fully resolved `null` is returned as is.
pub fn resolve_get<'a>(
    document: &'a Value,
    path: &ConfigPath,
    default: Option<&'a Value>,
) -> Result<Option<&'a Value>> {
    let mut node = document;
    for (depth, segment) in path.segments().iter().enumerate() {
        let Value::Object(map) = node else {
            return Err(path.conflict(depth));
        };
        match map.get(segment) {
            Some(next) => node = next,
            None => return Ok(default),
        }
    }
    Ok(Some(node))
}

/// Assign `value` at `path`, creating empty mappings for absent
/// intermediates. Returns the value previously stored there.
pub fn resolve_set(document: &mut Value, path: &ConfigPath, value: Value) -> Result<Option<Value>> {
    let (last, parents) = split_last(path)?;
    let mut node = document;
    for (depth, segment) in parents.iter().enumerate() {
        let Value::Object(map) = node else {
            return Err(path.conflict(depth));
        };
        node = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let Value::Object(map) = node else {
        return Err(path.conflict(parents.len()));
    };
    Ok(map.insert(last.clone(), value))
}

/// Remove and return the entry at `path`.
///
/// A path that does not fully resolve is a [`ConfigError::KeyNotFound`].
pub fn resolve_delete(document: &mut Value, path: &ConfigPath) -> Result<Value> {
    let (last, parents) = split_last(path)?;
    let mut node = document;
    for (depth, segment) in parents.iter().enumerate() {
        let Value::Object(map) = node else {
            return Err(path.conflict(depth));
        };
        node = map.get_mut(segment).ok_or_else(|| ConfigError::KeyNotFound {
            key: path.to_string(),
        })?;
    }
    let Value::Object(map) = node else {
        return Err(path.conflict(parents.len()));
    };
    // shift_remove keeps the order of the remaining keys
    map.shift_remove(last).ok_or_else(|| ConfigError::KeyNotFound {
        key: path.to_string(),
    })
}

fn split_last(path: &ConfigPath) -> Result<(&String, &[String])> {
    path.segments()
        .split_last()
        .ok_or_else(|| ConfigError::InvalidPath {
            key: path.to_string(),
            reason: "key is empty",
        })
}
