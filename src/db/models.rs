use std::borrow::Cow;

use rusqlite::types::Value;
use thiserror::Error;

use crate::scoring::attributes::{format_number, Attribute, ExactValue};

/// Columns the importer writes, in schema order.
pub const SONG_COLUMNS: [&str; 23] = [
    "title",
    "artist",
    "duration",
    "popularity",
    "release_year",
    "bpm",
    "energy",
    "valence",
    "acousticness",
    "danceability",
    "instrumentalness",
    "live_performance_factor",
    "recording_quality",
    "popularity_change",
    "genre",
    "tempo_range",
    "usage_context",
    "language",
    "mood",
    "explicitness",
    "cover_or_original",
    "genre_tags",
    "streaming_platforms",
];

/// Separator used when a tag list is flattened into a single column.
pub const TAG_SEPARATOR: &str = ", ";

/// Raw result of `SELECT * FROM songs`: column names plus untyped cells.
#[derive(Debug, Default)]
pub struct SongTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// A song to insert. Only columns listed in [`SONG_COLUMNS`] are kept.
#[derive(Debug, Default, Clone)]
pub struct NewSong {
    pub columns: Vec<(&'static str, Value)>,
}

impl NewSong {
    /// Build from a JSON object. Arrays are flattened into delimited text,
    /// booleans stored as 0/1, unknown keys skipped.
    pub fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut columns = Vec::new();
        for (key, value) in object {
            let Some(column) = SONG_COLUMNS.iter().find(|c| **c == key.as_str()) else {
                log::debug!("Ignoring unknown song field '{}'", key);
                continue;
            };
            columns.push((*column, json_to_sql(value)));
        }
        Self { columns }
    }
}

fn json_to_sql(value: &serde_json::Value) -> Value {
    use serde_json::Value as Json;
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Integer(i64::from(*b)),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Real).unwrap_or(Value::Null),
        },
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::Text(
            items
                .iter()
                .map(|item| match item {
                    Json::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(TAG_SEPARATOR),
        ),
        Json::Object(_) => Value::Text(value.to_string()),
    }
}

/// Why a cell could not be read as a number.
#[derive(Error, Debug, PartialEq)]
pub enum CoercionError {
    #[error("'{0}' is not a number")]
    NotNumeric(String),
    #[error("non-finite value {0}")]
    NonFinite(f64),
    #[error("binary value ({0} bytes)")]
    Blob(usize),
}

/// Coerce a SQLite cell to a float. `Ok(None)` means the cell is empty.
pub fn coerce_f64(value: &Value) -> Result<Option<f64>, CoercionError> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(*i as f64)),
        Value::Real(f) if f.is_finite() => Ok(Some(*f)),
        Value::Real(f) => Err(CoercionError::NonFinite(*f)),
        Value::Text(t) => {
            let trimmed = t.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Some(f)),
                Ok(f) => Err(CoercionError::NonFinite(f)),
                Err(_) => Err(CoercionError::NotNumeric(t.clone())),
            }
        }
        Value::Blob(b) => Err(CoercionError::Blob(b.len())),
    }
}

fn cell_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(format_number(*f)),
        Value::Text(t) => Some(t.clone()),
        Value::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
    }
}

/// A scoring rule could not read the attribute it needs from a song.
#[derive(Error, Debug, PartialEq)]
pub enum AccessError {
    #[error("{0} is missing")]
    Missing(Attribute),
    #[error("{attribute} value '{value}' is not numeric")]
    NotNumeric { attribute: Attribute, value: String },
    #[error("{0} holds binary data")]
    Binary(Attribute),
}

/// One catalog entry, after coercion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SongRecord {
    pub title: Option<String>,
    pub artist: Option<String>,

    pub duration: Option<f64>,
    pub popularity: Option<f64>,
    pub release_year: Option<f64>,
    pub bpm: Option<f64>,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub acousticness: Option<f64>,
    pub danceability: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub live_performance_factor: Option<f64>,
    pub recording_quality: Option<f64>,
    pub popularity_change: Option<f64>,

    pub genre: Option<String>,
    pub tempo_range: Option<String>,
    pub usage_context: Option<String>,
    pub language: Option<String>,
    pub mood: Option<String>,

    // Kept as stored; the exact-match rule normalizes at comparison time.
    pub explicitness: Option<Value>,
    pub cover_or_original: Option<Value>,

    pub genre_tags: Option<String>,
    pub streaming_platforms: Option<String>,
}

/// Borrowed view of one attribute's storage.
enum Field<'a> {
    Number(Option<f64>),
    Text(Option<&'a str>),
    Raw(Option<&'a Value>),
}

impl SongRecord {
    /// Build a record from one row of a [`SongTable`].
    /// Returns the record and the number of numeric cells that failed coercion.
    pub fn from_row(row_index: usize, columns: &[String], cells: &[Value]) -> (Self, usize) {
        let mut song = Self::default();
        let mut failures = 0;

        for (name, cell) in columns.iter().zip(cells) {
            match name.as_str() {
                "title" => song.title = cell_to_text(cell),
                "artist" => song.artist = cell_to_text(cell),
                key => {
                    let Some(attr) = Attribute::from_key(key) else {
                        continue;
                    };
                    if let Some(slot) = song.number_slot(attr) {
                        *slot = match coerce_f64(cell) {
                            Ok(v) => v,
                            Err(e) => {
                                log::warn!(
                                    "Row {}: could not coerce {} ({}), treating as absent",
                                    row_index,
                                    attr,
                                    e
                                );
                                failures += 1;
                                None
                            }
                        };
                    } else {
                        song.set_stored(attr, cell);
                    }
                }
            }
        }

        (song, failures)
    }

    fn number_slot(&mut self, attr: Attribute) -> Option<&mut Option<f64>> {
        let slot = match attr {
            Attribute::Duration => &mut self.duration,
            Attribute::Popularity => &mut self.popularity,
            Attribute::ReleaseYear => &mut self.release_year,
            Attribute::Bpm => &mut self.bpm,
            Attribute::Energy => &mut self.energy,
            Attribute::Valence => &mut self.valence,
            Attribute::Acousticness => &mut self.acousticness,
            Attribute::Danceability => &mut self.danceability,
            Attribute::Instrumentalness => &mut self.instrumentalness,
            Attribute::LivePerformanceFactor => &mut self.live_performance_factor,
            Attribute::RecordingQuality => &mut self.recording_quality,
            Attribute::PopularityChange => &mut self.popularity_change,
            _ => return None,
        };
        Some(slot)
    }

    fn set_stored(&mut self, attr: Attribute, cell: &Value) {
        let raw = match cell {
            Value::Null => None,
            other => Some(other.clone()),
        };
        match attr {
            Attribute::Genre => self.genre = cell_to_text(cell),
            Attribute::TempoRange => self.tempo_range = cell_to_text(cell),
            Attribute::UsageContext => self.usage_context = cell_to_text(cell),
            Attribute::Language => self.language = cell_to_text(cell),
            Attribute::Mood => self.mood = cell_to_text(cell),
            Attribute::Explicitness => self.explicitness = raw,
            Attribute::CoverOrOriginal => self.cover_or_original = raw,
            Attribute::GenreTags => self.genre_tags = cell_to_text(cell),
            Attribute::StreamingPlatforms => self.streaming_platforms = cell_to_text(cell),
            _ => {}
        }
    }

    fn field(&self, attr: Attribute) -> Field<'_> {
        match attr {
            Attribute::Duration => Field::Number(self.duration),
            Attribute::Popularity => Field::Number(self.popularity),
            Attribute::ReleaseYear => Field::Number(self.release_year),
            Attribute::Bpm => Field::Number(self.bpm),
            Attribute::Energy => Field::Number(self.energy),
            Attribute::Valence => Field::Number(self.valence),
            Attribute::Acousticness => Field::Number(self.acousticness),
            Attribute::Danceability => Field::Number(self.danceability),
            Attribute::Instrumentalness => Field::Number(self.instrumentalness),
            Attribute::LivePerformanceFactor => Field::Number(self.live_performance_factor),
            Attribute::RecordingQuality => Field::Number(self.recording_quality),
            Attribute::PopularityChange => Field::Number(self.popularity_change),
            Attribute::Genre => Field::Text(self.genre.as_deref()),
            Attribute::TempoRange => Field::Text(self.tempo_range.as_deref()),
            Attribute::UsageContext => Field::Text(self.usage_context.as_deref()),
            Attribute::Language => Field::Text(self.language.as_deref()),
            Attribute::Mood => Field::Text(self.mood.as_deref()),
            Attribute::Explicitness => Field::Raw(self.explicitness.as_ref()),
            Attribute::CoverOrOriginal => Field::Raw(self.cover_or_original.as_ref()),
            Attribute::GenreTags => Field::Text(self.genre_tags.as_deref()),
            Attribute::StreamingPlatforms => Field::Text(self.streaming_platforms.as_deref()),
        }
    }

    /// Numeric reading of an attribute, for the tolerance rule.
    pub fn number(&self, attr: Attribute) -> Result<f64, AccessError> {
        match self.field(attr) {
            Field::Number(Some(n)) => Ok(n),
            Field::Number(None) | Field::Text(None) | Field::Raw(None) => {
                Err(AccessError::Missing(attr))
            }
            Field::Text(Some(t)) => match coerce_f64(&Value::Text(t.to_string())) {
                Ok(Some(n)) => Ok(n),
                _ => Err(AccessError::NotNumeric {
                    attribute: attr,
                    value: t.to_string(),
                }),
            },
            Field::Raw(Some(v)) => self
                .exact(attr)?
                .as_f64()
                .ok_or_else(|| AccessError::NotNumeric {
                    attribute: attr,
                    value: cell_to_text(v).unwrap_or_default(),
                }),
        }
    }

    /// Text rendering of an attribute, for the categorical and list rules.
    pub fn text(&self, attr: Attribute) -> Result<Cow<'_, str>, AccessError> {
        match self.field(attr) {
            Field::Number(Some(n)) => Ok(Cow::Owned(format_number(n))),
            Field::Text(Some(t)) => Ok(Cow::Borrowed(t)),
            Field::Raw(Some(Value::Text(t))) => Ok(Cow::Borrowed(t.as_str())),
            Field::Raw(Some(Value::Blob(_))) => Err(AccessError::Binary(attr)),
            Field::Raw(Some(v)) => cell_to_text(v)
                .map(Cow::Owned)
                .ok_or(AccessError::Missing(attr)),
            Field::Number(None) | Field::Text(None) | Field::Raw(None) => {
                Err(AccessError::Missing(attr))
            }
        }
    }

    /// Canonical reading of an attribute, for the exact-match rule.
    pub fn exact(&self, attr: Attribute) -> Result<ExactValue, AccessError> {
        match self.field(attr) {
            Field::Number(Some(n)) => Ok(ExactValue::from_number(n)),
            Field::Text(Some(t)) => Ok(ExactValue::from_text(t)),
            Field::Raw(Some(Value::Integer(i))) => Ok(ExactValue::from_number(*i as f64)),
            Field::Raw(Some(Value::Real(f))) => Ok(ExactValue::from_number(*f)),
            Field::Raw(Some(Value::Text(t))) => Ok(ExactValue::from_text(t)),
            Field::Raw(Some(Value::Blob(_))) => Err(AccessError::Binary(attr)),
            Field::Number(None) | Field::Text(None) | Field::Raw(None) | Field::Raw(Some(Value::Null)) => {
                Err(AccessError::Missing(attr))
            }
        }
    }

    /// Display title, falling back to a placeholder for untitled rows.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }

    pub fn display_artist(&self) -> &str {
        self.artist.as_deref().unwrap_or("(unknown artist)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_coerce_f64() {
        assert_eq!(coerce_f64(&Value::Null), Ok(None));
        assert_eq!(coerce_f64(&Value::Integer(8)), Ok(Some(8.0)));
        assert_eq!(coerce_f64(&Value::Real(0.25)), Ok(Some(0.25)));
        assert_eq!(coerce_f64(&Value::Text(" 120 ".into())), Ok(Some(120.0)));
        assert_eq!(coerce_f64(&Value::Text("".into())), Ok(None));
        assert_eq!(
            coerce_f64(&Value::Text("loud".into())),
            Err(CoercionError::NotNumeric("loud".into()))
        );
        assert!(matches!(coerce_f64(&Value::Text("NaN".into())), Err(CoercionError::NonFinite(_))));
        assert_eq!(coerce_f64(&Value::Blob(vec![1, 2])), Err(CoercionError::Blob(2)));
    }

    #[test]
    fn test_from_row_coerces_numeric_and_counts_failures() {
        let cols = columns(&["id", "title", "energy", "bpm", "genre", "explicitness"]);
        let cells = vec![
            Value::Integer(7),
            Value::Text("Song A".into()),
            Value::Text("8".into()),
            Value::Text("fast-ish".into()),
            Value::Text("rock".into()),
            Value::Integer(1),
        ];
        let (song, failures) = SongRecord::from_row(0, &cols, &cells);

        assert_eq!(failures, 1);
        assert_eq!(song.title.as_deref(), Some("Song A"));
        assert_eq!(song.energy, Some(8.0));
        assert_eq!(song.bpm, None);
        assert_eq!(song.genre.as_deref(), Some("rock"));
        assert_eq!(song.explicitness, Some(Value::Integer(1)));
    }

    #[test]
    fn test_missing_columns_stay_absent() {
        let (song, failures) =
            SongRecord::from_row(0, &columns(&["title"]), &[Value::Text("Only title".into())]);
        assert_eq!(failures, 0);
        assert_eq!(song.number(Attribute::Energy), Err(AccessError::Missing(Attribute::Energy)));
        assert_eq!(song.text(Attribute::Genre), Err(AccessError::Missing(Attribute::Genre)));
    }

    #[test]
    fn test_number_view_of_non_numeric_attributes() {
        let song = SongRecord {
            tempo_range: Some("fast".into()),
            usage_context: Some(" 2 ".into()),
            explicitness: Some(Value::Text("True".into())),
            ..Default::default()
        };
        assert!(matches!(
            song.number(Attribute::TempoRange),
            Err(AccessError::NotNumeric { .. })
        ));
        assert_eq!(song.number(Attribute::UsageContext), Ok(2.0));
        assert_eq!(song.number(Attribute::Explicitness), Ok(1.0));
    }

    #[test]
    fn test_text_and_exact_views() {
        let song = SongRecord {
            energy: Some(8.0),
            explicitness: Some(Value::Integer(0)),
            cover_or_original: Some(Value::Text("original".into())),
            ..Default::default()
        };
        assert_eq!(song.text(Attribute::Energy).unwrap(), "8");
        assert_eq!(song.text(Attribute::Explicitness).unwrap(), "0");
        assert_eq!(song.exact(Attribute::Explicitness), Ok(ExactValue::Bool(false)));
        assert_eq!(
            song.exact(Attribute::CoverOrOriginal),
            Ok(ExactValue::Text("original".into()))
        );
    }

    #[test]
    fn test_new_song_from_json() {
        let json: serde_json::Value = serde_json::json!({
            "title": "A",
            "energy": 8,
            "danceability": 0.75,
            "explicitness": true,
            "genre_tags": ["indie", "lo-fi"],
            "rating": 5
        });
        let song = NewSong::from_json(json.as_object().unwrap());
        let get = |name: &str| {
            song.columns
                .iter()
                .find(|(c, _)| *c == name)
                .map(|(_, v)| v.clone())
        };

        assert_eq!(get("title"), Some(Value::Text("A".into())));
        assert_eq!(get("energy"), Some(Value::Integer(8)));
        assert_eq!(get("danceability"), Some(Value::Real(0.75)));
        assert_eq!(get("explicitness"), Some(Value::Integer(1)));
        assert_eq!(get("genre_tags"), Some(Value::Text("indie, lo-fi".into())));
        assert_eq!(get("rating"), None);
    }
}
