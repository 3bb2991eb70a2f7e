//! The fixed question flow that turns a handful of answers into preferences.

use std::io::{self, BufRead, Write};

use crate::scoring::{PreferenceValue, Preferences};

/// One labeled answer and the preference values it sets.
#[derive(Debug, Clone)]
pub struct Choice {
    pub label: &'static str,
    pub sets: Vec<(&'static str, PreferenceValue)>,
}

#[derive(Debug, Clone)]
pub struct Question {
    /// Preference key the question is about (used for listing).
    pub key: &'static str,
    pub prompt: &'static str,
    pub choices: Vec<Choice>,
}

impl Question {
    /// Record `choice` (0-based) into `prefs`. Later answers overwrite earlier ones.
    pub fn apply(&self, choice: usize, prefs: &mut Preferences) -> Option<&Choice> {
        let chosen = self.choices.get(choice)?;
        for (key, value) in &chosen.sets {
            prefs.insert(*key, value.clone());
        }
        Some(chosen)
    }
}

fn single(label: &'static str, key: &'static str, value: impl Into<PreferenceValue>) -> Choice {
    Choice {
        label,
        sets: vec![(key, value.into())],
    }
}

fn occasion(
    label: &'static str,
    energy: i32,
    mood: &'static str,
    danceability: f64,
    tempo: &'static str,
) -> Choice {
    Choice {
        label,
        sets: vec![
            ("energy", energy.into()),
            ("mood", mood.into()),
            ("danceability", danceability.into()),
            ("tempo_range", tempo.into()),
        ],
    }
}

/// The question flow, in the order it is asked.
///
/// Choice values match the vocabulary stored in the catalog (moods and
/// genres are Spanish there, languages are ISO codes).
pub fn default_questions() -> Vec<Question> {
    vec![
        Question {
            key: "usage_context",
            prompt: "What occasion or activity is this playlist for?",
            choices: vec![
                occasion("Studying", 3, "calmado", 0.2, "slow"),
                occasion("Working", 5, "neutral", 0.4, "moderate"),
                occasion("Working out", 8, "motivador", 0.8, "fast"),
                occasion("Party", 9, "alegre", 1.0, "fast"),
            ],
        },
        Question {
            key: "energy",
            prompt: "Should the music be relaxing, energizing, or somewhere in between?",
            choices: vec![
                single("Relaxing", "energy", 3),
                single("Energizing", "energy", 8),
                single("In between", "energy", 5),
            ],
        },
        Question {
            key: "mood",
            prompt: "Do you prefer cheerful, nostalgic, or neutral songs?",
            choices: vec![
                single("Cheerful", "mood", "alegre"),
                single("Nostalgic", "mood", "nostálgico"),
                single("Neutral", "mood", "neutral"),
            ],
        },
        Question {
            key: "tempo_range",
            prompt: "Fast and lively, or slower and calmer?",
            choices: vec![
                single("Fast", "tempo_range", "fast"),
                single("Slow", "tempo_range", "slow"),
                single("In between", "tempo_range", "moderate"),
            ],
        },
        Question {
            key: "popularity",
            prompt: "Popular songs or lesser-known discoveries?",
            choices: vec![
                single("Popular", "popularity", 80),
                single("Discoveries", "popularity", 40),
            ],
        },
        Question {
            key: "live_performance_factor",
            prompt: "Live recordings or studio recordings?",
            choices: vec![
                single("Live", "live_performance_factor", 7),
                single("Studio", "live_performance_factor", 3),
            ],
        },
        Question {
            key: "explicitness",
            prompt: "Are explicit lyrics fine?",
            choices: vec![
                single("Yes", "explicitness", 1),
                single("No", "explicitness", 0),
            ],
        },
        Question {
            key: "genre",
            prompt: "Which genre should the playlist lean towards?",
            choices: vec![
                single("Pop", "genre", "pop"),
                single("Rock", "genre", "rock"),
                single("Jazz", "genre", "jazz"),
                single("Classical", "genre", "clasica"),
            ],
        },
        Question {
            key: "language",
            prompt: "A specific language, or a mix?",
            choices: vec![
                single("Spanish", "language", "es"),
                single("English", "language", "en"),
                single("Multilingual", "language", "multi"),
            ],
        },
        Question {
            key: "release_year",
            prompt: "Classics or recent releases?",
            choices: vec![
                single("Classics", "release_year", 1990),
                single("Recent", "release_year", 2020),
            ],
        },
        Question {
            key: "cover_or_original",
            prompt: "Originals or covers?",
            choices: vec![
                single("Originals", "cover_or_original", "original"),
                single("Covers", "cover_or_original", "cover"),
            ],
        },
    ]
}

/// Ask every question on `output`, reading 1-based choice numbers from `input`.
///
/// Invalid answers re-prompt. End of input stops the flow early and returns
/// whatever was answered so far.
pub fn run<R: BufRead, W: Write>(
    questions: &[Question],
    input: &mut R,
    output: &mut W,
) -> io::Result<Preferences> {
    let mut prefs = Preferences::new();
    let total = questions.len();

    'questions: for (n, question) in questions.iter().enumerate() {
        writeln!(output)?;
        writeln!(output, "[{}/{}] {}", n + 1, total, question.prompt)?;
        for (i, choice) in question.choices.iter().enumerate() {
            writeln!(output, "  {}) {}", i + 1, choice.label)?;
        }

        loop {
            write!(output, "> ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                log::info!("Input ended after {} of {} questions", n, total);
                break 'questions;
            }

            let picked = line
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|k| k.checked_sub(1))
                .and_then(|k| question.apply(k, &mut prefs));
            match picked {
                Some(choice) => {
                    log::debug!("{} -> {}", question.key, choice.label);
                    break;
                }
                None => writeln!(
                    output,
                    "Please enter a number between 1 and {}.",
                    question.choices.len()
                )?,
            }
        }
    }

    Ok(prefs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_flow_shape() {
        let questions = default_questions();
        assert_eq!(questions.len(), 11);
        assert_eq!(questions[0].key, "usage_context");
        assert_eq!(questions[10].key, "cover_or_original");
        assert!(questions.iter().all(|q| !q.choices.is_empty()));
    }

    #[test]
    fn test_occasion_fans_out() {
        let questions = default_questions();
        let mut prefs = Preferences::new();
        questions[0].apply(3, &mut prefs).unwrap(); // Party

        assert_eq!(prefs.len(), 4);
        assert_eq!(prefs.get("energy"), Some(&PreferenceValue::Number(9.0)));
        assert_eq!(prefs.get("mood"), Some(&PreferenceValue::Text("alegre".into())));
        assert_eq!(prefs.get("danceability"), Some(&PreferenceValue::Number(1.0)));
        assert_eq!(prefs.get("tempo_range"), Some(&PreferenceValue::Text("fast".into())));
        assert!(prefs.get("usage_context").is_none());
    }

    #[test]
    fn test_out_of_range_choice() {
        let questions = default_questions();
        let mut prefs = Preferences::new();
        assert!(questions[1].apply(3, &mut prefs).is_none());
        assert!(prefs.is_empty());
    }

    #[test]
    fn test_run_full_flow_later_answers_win() {
        let questions = default_questions();
        // Party, then Relaxing energy, then the first choice for the rest
        let answers = "4\n1\n1\n1\n1\n1\n1\n1\n1\n1\n1\n";
        let mut input = Cursor::new(answers);
        let mut output = Vec::new();

        let prefs = run(&questions, &mut input, &mut output).unwrap();
        assert_eq!(prefs.get("energy"), Some(&PreferenceValue::Number(3.0)));
        assert_eq!(prefs.get("danceability"), Some(&PreferenceValue::Number(1.0)));
        assert_eq!(prefs.get("explicitness"), Some(&PreferenceValue::Number(1.0)));
        assert_eq!(prefs.get("cover_or_original"), Some(&PreferenceValue::Text("original".into())));

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("[1/11]"));
        assert!(text.contains("[11/11]"));
    }

    #[test]
    fn test_run_reprompts_on_invalid_input() {
        let questions = default_questions();
        let mut input = Cursor::new("banana\n0\n9\n2\n");
        let mut output = Vec::new();

        let prefs = run(&questions[1..2], &mut input, &mut output).unwrap();
        assert_eq!(prefs.get("energy"), Some(&PreferenceValue::Number(8.0)));

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("Please enter a number between 1 and 3.").count(), 3);
    }

    #[test]
    fn test_run_stops_at_end_of_input() {
        let questions = default_questions();
        let mut input = Cursor::new("2\n");
        let mut output = Vec::new();

        let prefs = run(&questions, &mut input, &mut output).unwrap();
        // Only the occasion answer made it in
        assert_eq!(prefs.len(), 4);
        assert_eq!(prefs.get("mood"), Some(&PreferenceValue::Text("neutral".into())));
    }
}
