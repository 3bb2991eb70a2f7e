use std::cmp::Ordering;
use std::fmt;

use super::attributes::{Attribute, AttributeKind};
use super::config::ScoringConfig;
use super::preferences::{PreferenceValue, Preferences};
use crate::db::models::{AccessError, SongRecord};

/// The contribution rule chosen for one preference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    NumericTolerant { tolerance: f64 },
    Categorical,
    Boolean,
    ListMembership,
}

impl Rule {
    /// Pick the rule for `attr = value`.
    ///
    /// A numeric value uses the tolerance rule only when the attribute has a
    /// tolerance entry. Everything else follows the attribute's static kind,
    /// so a numeric attribute without an entry scores nothing. `None` means
    /// the preference cannot score anything.
    pub fn resolve(attr: Attribute, value: &PreferenceValue, config: &ScoringConfig) -> Option<Self> {
        if value.as_number().is_some() {
            if let Some(tolerance) = config.tolerance(attr.key()) {
                return Some(Self::NumericTolerant { tolerance });
            }
        }

        match attr.kind() {
            AttributeKind::NumericTolerant => None,
            AttributeKind::Categorical => value.as_text().map(|_| Self::Categorical),
            AttributeKind::Boolean => value.exact().map(|_| Self::Boolean),
            AttributeKind::ListMembership => Some(Self::ListMembership),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NumericTolerant { tolerance } => write!(f, "within ±{tolerance}"),
            Self::Categorical => f.write_str("category"),
            Self::Boolean => f.write_str("exact"),
            Self::ListMembership => f.write_str("any tag"),
        }
    }
}

/// Points one preference added to one song.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub attribute: Attribute,
    pub rule: Rule,
    pub weight: f64,
    pub points: f64,
}

/// A catalog entry with its score for one call. Borrows the song; the
/// catalog itself is never touched.
#[derive(Debug, Clone)]
pub struct ScoredSong<'a> {
    pub song: &'a SongRecord,
    pub score: f64,
    pub contributions: Vec<Contribution>,
}

struct PlannedRule<'p> {
    attribute: Attribute,
    rule: Rule,
    weight: f64,
    value: &'p PreferenceValue,
}

/// Preferences resolved against a config, ready to apply to every song.
pub struct ScoringPlan<'p> {
    rules: Vec<PlannedRule<'p>>,
}

impl<'p> ScoringPlan<'p> {
    pub fn build(preferences: &'p Preferences, config: &ScoringConfig) -> Self {
        let mut rules = Vec::with_capacity(preferences.len());

        for (key, value) in preferences.iter() {
            // Unknown keys are ignored without a diagnostic
            let Some(attribute) = Attribute::from_key(key) else {
                continue;
            };
            match Rule::resolve(attribute, value, config) {
                Some(rule) => rules.push(PlannedRule {
                    attribute,
                    rule,
                    weight: config.weight(key),
                    value,
                }),
                None => log::debug!("No rule scores {} = {}", key, value),
            }
        }

        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Score one song. `index` is only used in diagnostics.
    pub fn score(&self, song: &SongRecord, index: usize) -> (f64, Vec<Contribution>) {
        let mut total = 0.0;
        let mut contributions = Vec::with_capacity(self.rules.len());

        for planned in &self.rules {
            let points = match planned.apply(song) {
                Ok(points) => points,
                Err(AccessError::Missing(attr)) => {
                    log::debug!("Song {} ({}): no {} value", index, song.display_title(), attr);
                    0.0
                }
                Err(e) => {
                    log::warn!("Song {} ({}): {}, scoring 0", index, song.display_title(), e);
                    0.0
                }
            };
            total += points;
            contributions.push(Contribution {
                attribute: planned.attribute,
                rule: planned.rule,
                weight: planned.weight,
                points,
            });
        }

        (total, contributions)
    }
}

impl PlannedRule<'_> {
    fn apply(&self, song: &SongRecord) -> Result<f64, AccessError> {
        let attr = self.attribute;
        let points = match self.rule {
            Rule::NumericTolerant { tolerance } => {
                let Some(user) = self.value.as_number() else {
                    return Ok(0.0);
                };
                tolerance_points(user, song.number(attr)?, tolerance, self.weight)
            }
            Rule::Categorical => {
                let Some(user) = self.value.as_text() else {
                    return Ok(0.0);
                };
                let stored = song.text(attr)?;
                if stored.trim().to_lowercase() == user.trim().to_lowercase() {
                    self.weight
                } else {
                    0.0
                }
            }
            Rule::Boolean => {
                let Some(user) = self.value.exact() else {
                    return Ok(0.0);
                };
                if song.exact(attr)? == user {
                    self.weight
                } else {
                    0.0
                }
            }
            Rule::ListMembership => {
                let stored = song.text(attr)?.to_lowercase();
                let hit = self
                    .value
                    .tags()
                    .iter()
                    .map(|tag| tag.trim().to_lowercase())
                    .filter(|tag| !tag.is_empty())
                    .any(|tag| stored.contains(&tag));
                if hit { self.weight } else { 0.0 }
            }
        };
        Ok(points)
    }
}

/// `weight * (1 - |u - s| / (t + 1))` inside `[u - t, u + t]`, else 0.
pub fn tolerance_points(user: f64, song: f64, tolerance: f64, weight: f64) -> f64 {
    if song >= user - tolerance && song <= user + tolerance {
        weight * (1.0 - (user - song).abs() / (tolerance + 1.0))
    } else {
        0.0
    }
}

/// Score one song against a preference set.
pub fn score_song(song: &SongRecord, preferences: &Preferences, config: &ScoringConfig) -> f64 {
    ScoringPlan::build(preferences, config).score(song, 0).0
}

/// Score every song and return all of them, best first.
/// Equal scores keep catalog order.
pub fn score_and_rank<'a>(
    songs: &'a [SongRecord],
    preferences: &Preferences,
    config: &ScoringConfig,
) -> Vec<ScoredSong<'a>> {
    let plan = ScoringPlan::build(preferences, config);
    if plan.is_empty() {
        log::debug!("No preference applies; every song scores 0");
    }

    let mut scored: Vec<ScoredSong<'a>> = songs
        .iter()
        .enumerate()
        .map(|(i, song)| {
            let (score, contributions) = plan.score(song, i);
            ScoredSong {
                song,
                score,
                contributions,
            }
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rusqlite::types::Value;
    use std::collections::HashMap;

    use crate::scoring::config::ScoringOverrides;

    fn song(title: &str) -> SongRecord {
        SongRecord {
            title: Some(title.to_string()),
            artist: Some("X".to_string()),
            ..Default::default()
        }
    }

    fn titles<'a>(ranked: &'a [ScoredSong<'_>]) -> Vec<&'a str> {
        ranked.iter().map(|s| s.song.display_title()).collect()
    }

    #[test]
    fn test_worked_example() {
        let songs = vec![
            SongRecord {
                energy: Some(3.0),
                genre: Some("pop".into()),
                ..song("B")
            },
            SongRecord {
                energy: Some(8.0),
                genre: Some("rock".into()),
                ..song("A")
            },
        ];
        let prefs: Preferences = [
            ("energy", PreferenceValue::from(8)),
            ("genre", PreferenceValue::from("rock")),
        ]
        .into_iter()
        .collect();

        let ranked = score_and_rank(&songs, &prefs, &ScoringConfig::default());
        assert_eq!(titles(&ranked), vec!["A", "B"]);
        assert_relative_eq!(ranked[0].score, 3.0);
        assert_relative_eq!(ranked[1].score, 0.0);
    }

    #[test]
    fn test_empty_preferences_keep_order() {
        let songs = vec![song("one"), song("two"), song("three")];
        let ranked = score_and_rank(&songs, &Preferences::new(), &ScoringConfig::default());

        assert_eq!(titles(&ranked), vec!["one", "two", "three"]);
        assert!(ranked.iter().all(|s| s.score == 0.0));
        assert!(ranked.iter().all(|s| s.contributions.is_empty()));
    }

    #[test]
    fn test_empty_catalog() {
        let prefs: Preferences = [("energy", 5)].into_iter().collect();
        assert!(score_and_rank(&[], &prefs, &ScoringConfig::default()).is_empty());
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let songs = vec![
            SongRecord { genre: Some("jazz".into()), ..song("first") },
            SongRecord { genre: Some("rock".into()), ..song("second") },
            SongRecord { genre: Some("jazz".into()), ..song("third") },
            SongRecord { genre: Some("rock".into()), ..song("fourth") },
        ];
        let prefs: Preferences = [("genre", "rock")].into_iter().collect();
        let ranked = score_and_rank(&songs, &prefs, &ScoringConfig::default());
        assert_eq!(titles(&ranked), vec!["second", "fourth", "first", "third"]);
    }

    #[test]
    fn test_exact_numeric_match_gives_full_weight() {
        let config = ScoringConfig::default();
        for (key, value) in [("energy", 5.0), ("bpm", 120.0), ("danceability", 0.4), ("popularity", 80.0)] {
            let mut s = song("s");
            match key {
                "energy" => s.energy = Some(value),
                "bpm" => s.bpm = Some(value),
                "danceability" => s.danceability = Some(value),
                _ => s.popularity = Some(value),
            }
            let prefs: Preferences = [(key, value)].into_iter().collect();
            assert_relative_eq!(score_song(&s, &prefs, &config), config.weight(key));
        }
    }

    #[test]
    fn test_tolerance_band_decays_then_drops_to_zero() {
        // bpm: weight 1.5, tolerance 10
        let points: Vec<f64> = [120.0, 123.0, 126.0, 130.0, 131.0]
            .iter()
            .map(|s| tolerance_points(120.0, *s, 10.0, 1.5))
            .collect();

        assert_relative_eq!(points[0], 1.5);
        assert!(points[0] > points[1] && points[1] > points[2] && points[2] > points[3]);
        // Boundary keeps a small positive amount
        assert_relative_eq!(points[3], 1.5 * (1.0 - 10.0 / 11.0));
        assert_eq!(points[4], 0.0);
        // Symmetric below the preferred value
        assert_relative_eq!(tolerance_points(120.0, 117.0, 10.0, 1.5), points[1]);
    }

    #[test]
    fn test_zero_tolerance_requires_exact_value() {
        assert_relative_eq!(tolerance_points(1990.0, 1990.0, 0.0, 1.0), 1.0);
        assert_eq!(tolerance_points(1990.0, 1991.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_missing_numeric_value_scores_zero_for_that_attribute_only() {
        let s = SongRecord { genre: Some("rock".into()), ..song("no energy") };
        let prefs: Preferences = [
            ("energy", PreferenceValue::from(8)),
            ("genre", PreferenceValue::from("rock")),
        ]
        .into_iter()
        .collect();
        assert_relative_eq!(score_song(&s, &prefs, &ScoringConfig::default()), 1.0);
    }

    #[test]
    fn test_categorical_is_case_and_trim_insensitive() {
        let s = SongRecord { genre: Some(" pop ".into()), ..song("s") };
        let prefs: Preferences = [("genre", "Pop")].into_iter().collect();
        assert_relative_eq!(score_song(&s, &prefs, &ScoringConfig::default()), 1.0);
    }

    #[test]
    fn test_dual_attribute_resolution() {
        let config = ScoringConfig::default();
        let s = SongRecord { tempo_range: Some("Fast".into()), ..song("s") };

        // Text answer → categorical, full tempo_range weight
        let prefs: Preferences = [("tempo_range", "fast")].into_iter().collect();
        assert_relative_eq!(score_song(&s, &prefs, &config), 1.5);

        // Numeric answer → tolerance rule; "Fast" is not a number, so 0
        let prefs: Preferences = [("tempo_range", 2)].into_iter().collect();
        assert_eq!(score_song(&s, &prefs, &config), 0.0);

        assert_eq!(
            Rule::resolve(Attribute::TempoRange, &PreferenceValue::from(2), &config),
            Some(Rule::NumericTolerant { tolerance: 0.5 })
        );
        assert_eq!(
            Rule::resolve(Attribute::TempoRange, &PreferenceValue::from("fast"), &config),
            Some(Rule::Categorical)
        );
    }

    #[test]
    fn test_numeric_attribute_without_tolerance_entry_scores_nothing() {
        let config = ScoringConfig::default();
        assert_eq!(
            Rule::resolve(Attribute::ReleaseYear, &PreferenceValue::from(1990), &config),
            None
        );
        let s = SongRecord {
            release_year: Some(1990.0),
            acousticness: Some(0.5),
            ..song("s")
        };
        let year: Preferences = [("release_year", 1990)].into_iter().collect();
        let acoustic: Preferences = [("acousticness", 0.5)].into_iter().collect();
        assert_eq!(score_song(&s, &year, &config), 0.0);
        assert_eq!(score_song(&s, &acoustic, &config), 0.0);
    }

    #[test]
    fn test_tolerance_override_enables_numeric_attribute() {
        let overrides = ScoringOverrides {
            tolerances: HashMap::from([("release_year".to_string(), 5.0)]),
            ..Default::default()
        };
        let config = ScoringConfig::with_overrides(&overrides);
        let s = SongRecord { release_year: Some(1992.0), ..song("s") };
        let prefs: Preferences = [("release_year", 1990)].into_iter().collect();
        assert_relative_eq!(score_song(&s, &prefs, &config), 1.0 - 2.0 / 6.0);
    }

    #[test]
    fn test_text_on_numeric_attribute_scores_nothing() {
        let config = ScoringConfig::default();
        assert_eq!(
            Rule::resolve(Attribute::Energy, &PreferenceValue::from("high"), &config),
            None
        );
    }

    #[test]
    fn test_explicitness_matches_across_representations() {
        let config = ScoringConfig::default();
        let prefs: Preferences = [("explicitness", 1)].into_iter().collect();
        for stored in [
            Value::Integer(1),
            Value::Real(1.0),
            Value::Text("True".into()),
            Value::Text("true".into()),
        ] {
            let s = SongRecord { explicitness: Some(stored.clone()), ..song("s") };
            assert_relative_eq!(score_song(&s, &prefs, &config), 1.0);
        }
        let clean = SongRecord { explicitness: Some(Value::Text("False".into())), ..song("s") };
        assert_eq!(score_song(&clean, &prefs, &config), 0.0);

        // A boolean answer takes the exact rule and matches too
        let flag: Preferences = [("explicitness", true)].into_iter().collect();
        let s = SongRecord { explicitness: Some(Value::Integer(1)), ..song("s") };
        assert_relative_eq!(score_song(&s, &flag, &config), 1.0);
    }

    #[test]
    fn test_cover_or_original_is_exact() {
        let config = ScoringConfig::default();
        let s = SongRecord {
            cover_or_original: Some(Value::Text("original".into())),
            ..song("s")
        };
        let hit: Preferences = [("cover_or_original", "original")].into_iter().collect();
        let miss: Preferences = [("cover_or_original", "Original")].into_iter().collect();
        assert_relative_eq!(score_song(&s, &hit, &config), 1.0);
        assert_eq!(score_song(&s, &miss, &config), 0.0);
    }

    #[test]
    fn test_list_membership_partial_match() {
        let config = ScoringConfig::default();
        let s = SongRecord {
            streaming_platforms: Some("Spotify, Apple Music".into()),
            ..song("s")
        };
        let hit: Preferences = [("streaming_platforms", vec!["tidal", "apple"])].into_iter().collect();
        let miss: Preferences = [("streaming_platforms", vec!["tidal", "deezer"])].into_iter().collect();
        let blank: Preferences = [("streaming_platforms", vec!["  "])].into_iter().collect();

        assert_relative_eq!(score_song(&s, &hit, &config), 1.0);
        assert_eq!(score_song(&s, &miss, &config), 0.0);
        assert_eq!(score_song(&s, &blank, &config), 0.0);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let s = SongRecord { genre: Some("rock".into()), ..song("s") };
        let prefs: Preferences = [
            ("genre", PreferenceValue::from("rock")),
            ("occasion", PreferenceValue::from("party")),
            ("title", PreferenceValue::from("s")),
        ]
        .into_iter()
        .collect();
        let plan = ScoringPlan::build(&prefs, &ScoringConfig::default());
        assert!(!plan.is_empty());
        let (score, contributions) = plan.score(&s, 0);
        assert_relative_eq!(score, 1.0);
        assert_eq!(contributions.len(), 1);
        assert_eq!(contributions[0].attribute, Attribute::Genre);

        let only_unknown: Preferences = [("occasion", "party")].into_iter().collect();
        assert!(ScoringPlan::build(&only_unknown, &ScoringConfig::default()).is_empty());
    }

    #[test]
    fn test_overrides_change_weights_and_tolerances() {
        let overrides = ScoringOverrides {
            weights: HashMap::from([("energy".to_string(), 4.0)]),
            tolerances: HashMap::from([("energy".to_string(), 3.0)]),
        };
        let config = ScoringConfig::with_overrides(&overrides);
        let s = SongRecord { energy: Some(6.0), ..song("s") };
        let prefs: Preferences = [("energy", 8)].into_iter().collect();

        // Outside the default band of 1, inside the widened band of 3
        assert_eq!(score_song(&s, &prefs, &ScoringConfig::default()), 0.0);
        assert_relative_eq!(score_song(&s, &prefs, &config), 4.0 * (1.0 - 2.0 / 4.0));
    }

    #[test]
    fn test_contributions_sum_to_score() {
        let s = SongRecord {
            energy: Some(7.5),
            mood: Some("alegre".into()),
            danceability: Some(0.95),
            ..song("s")
        };
        let prefs: Preferences = [
            ("energy", PreferenceValue::from(8)),
            ("mood", PreferenceValue::from("alegre")),
            ("danceability", PreferenceValue::from(1.0)),
        ]
        .into_iter()
        .collect();
        let plan = ScoringPlan::build(&prefs, &ScoringConfig::default());
        let (score, contributions) = plan.score(&s, 0);

        let sum: f64 = contributions.iter().map(|c| c.points).sum();
        assert_relative_eq!(score, sum);
        assert_eq!(contributions.len(), 3);
        assert!(contributions.iter().all(|c| c.points > 0.0 && c.points <= c.weight));
    }
}
