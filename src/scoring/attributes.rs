//! Static attribute table.
//!
//! Every scorable song attribute has exactly one [`AttributeKind`], fixed at
//! compile time. The kind decides which contribution rule applies, except for
//! numeric preference values on attributes with a tolerance entry (see
//! [`super::engine::Rule::resolve`]).

use std::fmt;

/// How an attribute is compared against a preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Numeric distance inside a tolerance band, linear decay.
    NumericTolerant,
    /// Trimmed, case-insensitive string equality.
    Categorical,
    /// Exact equality after normalizing both sides (see [`ExactValue`]).
    Boolean,
    /// Case-insensitive substring search for any of the preferred tags.
    ListMembership,
}

/// A known, scorable song attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    // Numeric
    Duration,
    Popularity,
    ReleaseYear,
    Bpm,
    Energy,
    Valence,
    Acousticness,
    Danceability,
    Instrumentalness,
    LivePerformanceFactor,
    RecordingQuality,
    PopularityChange,
    // Categorical
    Genre,
    TempoRange,
    UsageContext,
    Language,
    Mood,
    // Exact
    Explicitness,
    CoverOrOriginal,
    // Lists
    GenreTags,
    StreamingPlatforms,
}

impl Attribute {
    pub const ALL: [Attribute; 21] = [
        Self::Duration,
        Self::Popularity,
        Self::ReleaseYear,
        Self::Bpm,
        Self::Energy,
        Self::Valence,
        Self::Acousticness,
        Self::Danceability,
        Self::Instrumentalness,
        Self::LivePerformanceFactor,
        Self::RecordingQuality,
        Self::PopularityChange,
        Self::Genre,
        Self::TempoRange,
        Self::UsageContext,
        Self::Language,
        Self::Mood,
        Self::Explicitness,
        Self::CoverOrOriginal,
        Self::GenreTags,
        Self::StreamingPlatforms,
    ];

    /// Look up an attribute by its column / preference key.
    /// Unknown keys return `None` and are never scored.
    pub fn from_key(key: &str) -> Option<Self> {
        let attr = match key {
            "duration" => Self::Duration,
            "popularity" => Self::Popularity,
            "release_year" => Self::ReleaseYear,
            "bpm" => Self::Bpm,
            "energy" => Self::Energy,
            "valence" => Self::Valence,
            "acousticness" => Self::Acousticness,
            "danceability" => Self::Danceability,
            "instrumentalness" => Self::Instrumentalness,
            "live_performance_factor" => Self::LivePerformanceFactor,
            "recording_quality" => Self::RecordingQuality,
            "popularity_change" => Self::PopularityChange,
            "genre" => Self::Genre,
            "tempo_range" => Self::TempoRange,
            "usage_context" => Self::UsageContext,
            "language" => Self::Language,
            "mood" => Self::Mood,
            "explicitness" => Self::Explicitness,
            "cover_or_original" => Self::CoverOrOriginal,
            "genre_tags" => Self::GenreTags,
            "streaming_platforms" => Self::StreamingPlatforms,
            _ => return None,
        };
        Some(attr)
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Duration => "duration",
            Self::Popularity => "popularity",
            Self::ReleaseYear => "release_year",
            Self::Bpm => "bpm",
            Self::Energy => "energy",
            Self::Valence => "valence",
            Self::Acousticness => "acousticness",
            Self::Danceability => "danceability",
            Self::Instrumentalness => "instrumentalness",
            Self::LivePerformanceFactor => "live_performance_factor",
            Self::RecordingQuality => "recording_quality",
            Self::PopularityChange => "popularity_change",
            Self::Genre => "genre",
            Self::TempoRange => "tempo_range",
            Self::UsageContext => "usage_context",
            Self::Language => "language",
            Self::Mood => "mood",
            Self::Explicitness => "explicitness",
            Self::CoverOrOriginal => "cover_or_original",
            Self::GenreTags => "genre_tags",
            Self::StreamingPlatforms => "streaming_platforms",
        }
    }

    pub fn kind(self) -> AttributeKind {
        match self {
            Self::Duration
            | Self::Popularity
            | Self::ReleaseYear
            | Self::Bpm
            | Self::Energy
            | Self::Valence
            | Self::Acousticness
            | Self::Danceability
            | Self::Instrumentalness
            | Self::LivePerformanceFactor
            | Self::RecordingQuality
            | Self::PopularityChange => AttributeKind::NumericTolerant,
            Self::Genre | Self::TempoRange | Self::UsageContext | Self::Language | Self::Mood => {
                AttributeKind::Categorical
            }
            Self::Explicitness | Self::CoverOrOriginal => AttributeKind::Boolean,
            Self::GenreTags | Self::StreamingPlatforms => AttributeKind::ListMembership,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Canonical form used by the exact-equality rule.
///
/// `0`/`1` (integer, real or text) and `true`/`false`/`yes`/`no` in any case
/// all collapse to `Bool`, so a UI answer of `1` matches a catalog that stores
/// `True`. Other numbers stay numbers; other text is compared verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum ExactValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ExactValue {
    pub fn from_number(n: f64) -> Self {
        if n == 1.0 {
            Self::Bool(true)
        } else if n == 0.0 {
            Self::Bool(false)
        } else {
            Self::Number(n)
        }
    }

    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return Self::from_number(n);
            }
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" => Self::Bool(true),
            "false" | "no" => Self::Bool(false),
            _ => Self::Text(text.to_string()),
        }
    }

    /// Numeric reading of the value, if it has one (`true` → 1, `false` → 0).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

/// Render a number the way a user would type it: `8` rather than `8.0`.
pub fn format_number(n: f64) -> String {
    format!("{n}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_lookup_roundtrips_for_every_attribute() {
        for attr in Attribute::ALL {
            assert_eq!(Attribute::from_key(attr.key()), Some(attr));
        }
        assert_eq!(Attribute::from_key("title"), None);
        assert_eq!(Attribute::from_key("Energy"), None);
        assert_eq!(Attribute::from_key("occasion"), None);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Attribute::Energy.kind(), AttributeKind::NumericTolerant);
        assert_eq!(Attribute::ReleaseYear.kind(), AttributeKind::NumericTolerant);
        assert_eq!(Attribute::TempoRange.kind(), AttributeKind::Categorical);
        assert_eq!(Attribute::UsageContext.kind(), AttributeKind::Categorical);
        assert_eq!(Attribute::Explicitness.kind(), AttributeKind::Boolean);
        assert_eq!(Attribute::CoverOrOriginal.kind(), AttributeKind::Boolean);
        assert_eq!(Attribute::StreamingPlatforms.kind(), AttributeKind::ListMembership);
    }

    #[test]
    fn test_exact_value_normalization() {
        assert_eq!(ExactValue::from_number(1.0), ExactValue::Bool(true));
        assert_eq!(ExactValue::from_number(0.0), ExactValue::Bool(false));
        assert_eq!(ExactValue::from_number(2.0), ExactValue::Number(2.0));

        assert_eq!(ExactValue::from_text("True"), ExactValue::Bool(true));
        assert_eq!(ExactValue::from_text(" no "), ExactValue::Bool(false));
        assert_eq!(ExactValue::from_text("1"), ExactValue::Bool(true));
        assert_eq!(ExactValue::from_text("0.0"), ExactValue::Bool(false));
        assert_eq!(ExactValue::from_text("cover"), ExactValue::Text("cover".into()));
        // Non-boolean text is compared verbatim
        assert_ne!(ExactValue::from_text("Cover"), ExactValue::from_text("cover"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(8.0), "8");
        assert_eq!(format_number(0.5), "0.5");
    }
}
