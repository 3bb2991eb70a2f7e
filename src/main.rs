use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use playlist_expert::catalog::Catalog;
use playlist_expert::config::AppConfig;
use playlist_expert::db::models::NewSong;
use playlist_expert::db::Database;
use playlist_expert::engine::PlaylistEngine;
use playlist_expert::questionnaire;
use playlist_expert::scoring::{Preferences, ScoredSong, ScoringConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "playlist-expert", version, about = "Answer a few questions, get a ranked playlist")]
struct Cli {
    /// Path to the SQLite song store
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Config file (defaults to the XDG config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the catalog for preferences given on the command line
    Recommend {
        /// Preference as key=value (repeatable), e.g. energy=8 genre=rock genre_tags=[indie,lo-fi]
        #[arg(short, long = "pref", value_name = "KEY=VALUE")]
        prefs: Vec<String>,

        /// Number of results (defaults to config top_n)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Show how each preference contributed to the score
        #[arg(long)]
        explain: bool,
    },

    /// Answer the question flow interactively, then rank the catalog
    Ask {
        /// Number of results (defaults to config top_n)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Show how each preference contributed to the score
        #[arg(long)]
        explain: bool,
    },

    /// List the questions and the preferences each answer sets
    Questions,

    /// Create an empty song store
    Init,

    /// Import songs from a JSON array of objects
    Import {
        /// JSON file to read
        file: PathBuf,
    },

    /// Show catalog statistics
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    // Resolve store path: CLI > config > XDG default
    let db_path = cli
        .db_path
        .or(config.db_path.clone())
        .unwrap_or_else(playlist_expert::config::default_db_path);
    log::info!("Song store: {}", db_path.display());

    match cli.command {
        Commands::Recommend { prefs, limit, explain } => {
            let scoring = config.scoring_config()?;
            let preferences = Preferences::from_pairs(prefs.iter().map(String::as_str))
                .context("Invalid --pref")?;
            recommend(&db_path, &preferences, &scoring, limit.unwrap_or(config.top_n), explain);
        }

        Commands::Ask { limit, explain } => {
            let scoring = config.scoring_config()?;
            let questions = questionnaire::default_questions();
            let stdin = std::io::stdin();
            let preferences = questionnaire::run(&questions, &mut stdin.lock(), &mut std::io::stdout())
                .context("Failed to read answers")?;
            println!();
            recommend(&db_path, &preferences, &scoring, limit.unwrap_or(config.top_n), explain);
        }

        Commands::Questions => {
            for (n, question) in questionnaire::default_questions().iter().enumerate() {
                println!("{:>2}. {} [{}]", n + 1, question.prompt, question.key);
                for choice in &question.choices {
                    let sets: Vec<String> = choice
                        .sets
                        .iter()
                        .map(|(key, value)| format!("{key}={value}"))
                        .collect();
                    println!("      {:<14} {}", choice.label, sets.join(" "));
                }
            }
        }

        Commands::Init => {
            let db = Database::create(&db_path).context("Failed to create song store")?;
            let count = db.song_count()?;
            db.close()?;
            println!("Song store ready at {} ({} songs)", db_path.display(), count);
        }

        Commands::Import { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let objects: Vec<serde_json::Map<String, serde_json::Value>> =
                serde_json::from_str(&contents)
                    .with_context(|| format!("{} is not a JSON array of objects", file.display()))?;
            let songs: Vec<NewSong> = objects.iter().map(NewSong::from_json).collect();

            let db = Database::create(&db_path).context("Failed to open song store")?;
            let imported = db.import_songs(&songs).context("Import failed")?;
            let total = db.song_count()?;
            db.close()?;
            println!("Imported {} songs ({} in store)", imported, total);
        }

        Commands::Stats => {
            let mut engine = PlaylistEngine::open(&db_path);
            match engine.catalog() {
                Some(catalog) => print_stats(catalog),
                None => report_unavailable(&engine),
            }
            engine.close();
        }
    }

    Ok(())
}

/// Rank and print. A missing store or empty result is reported, not an error.
fn recommend(
    db_path: &Path,
    preferences: &Preferences,
    scoring: &ScoringConfig,
    limit: usize,
    explain: bool,
) {
    let mut engine = PlaylistEngine::open(db_path);
    if engine.is_degraded() {
        report_unavailable(&engine);
    }

    {
        let ranked = engine.recommend(preferences, scoring);
        if ranked.is_empty() {
            println!("No matching songs found.");
        } else {
            println!("Recommended playlist:");
            println!();
            print_results(&ranked, limit, explain);
        }
    }

    engine.close();
}

fn report_unavailable(engine: &PlaylistEngine) {
    match engine.diagnostic() {
        Some(e) => eprintln!("Song store unavailable: {e}"),
        None => eprintln!("Song store unavailable"),
    }
}

/// Truncate to `width` characters, marking the cut with "...".
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    }
}

/// Print the top `limit` songs with title, artist and score.
fn print_results(ranked: &[ScoredSong<'_>], limit: usize, explain: bool) {
    println!("{:>3}  {:<32} {:<24} {:>6}", "#", "Title", "Artist", "Score");
    println!("{}", "-".repeat(69));

    for (i, scored) in ranked.iter().take(limit).enumerate() {
        println!(
            "{:>3}  {:<32} {:<24} {:>6.2}",
            i + 1,
            truncate(scored.song.display_title(), 32),
            truncate(scored.song.display_artist(), 24),
            scored.score,
        );

        if explain {
            for c in &scored.contributions {
                println!(
                    "       {:<24} {:<14} {:>5.2} / {:.2}",
                    c.attribute.key(),
                    c.rule.to_string(),
                    c.points,
                    c.weight
                );
            }
        }
    }

    if ranked.len() > limit {
        println!();
        println!("({} more songs not shown)", ranked.len() - limit);
    }
}

fn print_stats(catalog: &Catalog) {
    println!("Catalog Statistics");
    println!("==================");
    println!("Songs:              {}", catalog.len());
    println!("Unreadable numbers: {}", catalog.coercion_failures());
    println!();

    let mut genres: HashMap<String, usize> = HashMap::new();
    for song in catalog.songs() {
        let genre = song
            .genre
            .as_deref()
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| "(none)".to_string());
        *genres.entry(genre).or_insert(0) += 1;
    }

    if !genres.is_empty() {
        let mut genres: Vec<(String, usize)> = genres.into_iter().collect();
        genres.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        println!("Genres:");
        for (genre, count) in &genres {
            println!("  {:<20} {}", genre, count);
        }
    }
}
