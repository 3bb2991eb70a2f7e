pub mod attributes;
pub mod config;
pub mod engine;
pub mod preferences;

pub use attributes::{Attribute, AttributeKind, ExactValue};
pub use config::{ScoringConfig, ScoringOverrides};
pub use engine::{score_and_rank, score_song, Contribution, Rule, ScoredSong, ScoringPlan};
pub use preferences::{PreferenceError, PreferenceValue, Preferences};
