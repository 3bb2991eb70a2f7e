use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::attributes::{format_number, ExactValue};

#[derive(Error, Debug, PartialEq)]
pub enum PreferenceError {
    #[error("expected key=value, got '{0}'")]
    MissingSeparator(String),
    #[error("empty key in '{0}'")]
    EmptyKey(String),
}

/// A single user-chosen value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    Flag(bool),
    Number(f64),
    Text(String),
    Tags(Vec<String>),
}

impl PreferenceValue {
    /// Parse a command-line value: `8`, `true`, `[pop, rock]` or free text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            return Self::Tags(
                inner
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
            );
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return Self::Number(n);
            }
        }
        match trimmed {
            "true" => Self::Flag(true),
            "false" => Self::Flag(false),
            _ => Self::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text rendering used by the categorical rule. Tag lists have none.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Flag(b) => Some(Cow::Owned(b.to_string())),
            Self::Number(n) => Some(Cow::Owned(format_number(*n))),
            Self::Text(t) => Some(Cow::Borrowed(t.as_str())),
            Self::Tags(_) => None,
        }
    }

    /// Tags to look for under the list-membership rule. A scalar counts as one tag.
    pub fn tags(&self) -> Vec<Cow<'_, str>> {
        match self {
            Self::Tags(tags) => tags.iter().map(|t| Cow::Borrowed(t.as_str())).collect(),
            other => other.as_text().into_iter().collect(),
        }
    }

    /// Canonical value for the exact-match rule.
    pub fn exact(&self) -> Option<ExactValue> {
        match self {
            Self::Flag(b) => Some(ExactValue::Bool(*b)),
            Self::Number(n) => Some(ExactValue::from_number(*n)),
            Self::Text(t) => Some(ExactValue::from_text(t)),
            Self::Tags(_) => None,
        }
    }
}

impl fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(t) => write!(f, "\"{t}\""),
            Self::Tags(tags) => write!(f, "[{}]", tags.join(", ")),
        }
    }
}

impl From<f64> for PreferenceValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for PreferenceValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for PreferenceValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

impl From<&str> for PreferenceValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<&str>> for PreferenceValue {
    fn from(tags: Vec<&str>) -> Self {
        Self::Tags(tags.into_iter().map(String::from).collect())
    }
}

/// The user's answers so far: one value per attribute key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Preferences(BTreeMap<String, PreferenceValue>);

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any earlier answer for it.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PreferenceValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PreferenceValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PreferenceValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse `key=value` pairs from the command line.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, PreferenceError> {
        let mut prefs = Self::new();
        for pair in pairs {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| PreferenceError::MissingSeparator(pair.to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(PreferenceError::EmptyKey(pair.to_string()));
            }
            prefs.insert(key, PreferenceValue::parse(value));
        }
        Ok(prefs)
    }
}

impl<K: Into<String>, V: Into<PreferenceValue>> FromIterator<(K, V)> for Preferences {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut prefs = Self::new();
        for (k, v) in iter {
            prefs.insert(k, v);
        }
        prefs
    }
}
