mod clock;
mod models;
mod scheduler;
mod store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use clock::SystemClock;
use models::{AttemptOutcome, JsonOutput};
use scheduler::Scheduler;
use store::{RecordKey, SqliteStore};

const DEFAULT_DB_NAME: &str = "drill.db";

#[derive(Parser)]
#[command(name = "drill")]
#[command(about = "An adaptive practice scheduler: weighted concept selection and level progression")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Learner identifier
    #[arg(long, global = true, default_value = "default")]
    learner: String,

    /// Subject identifier (one progress record per learner and subject)
    #[arg(long, global = true, default_value = "default")]
    subject: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record an attempt at a concept
    Record {
        /// Concept identifier
        concept: String,

        /// Attempt outcome: correct/wrong
        #[arg(long, short)]
        outcome: String,
    },

    /// Pick the next concept to practice from a candidate pool
    Next {
        /// Candidate concept identifiers (at least one)
        #[arg(required = true)]
        concepts: Vec<String>,
    },

    /// Show practice statistics
    Stats,

    /// Check whether a new level unlocks
    Check,

    /// Manage the current level
    #[command(subcommand)]
    Level(LevelCommands),

    /// Erase all progress for this learner and subject
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum LevelCommands {
    /// Show the current level
    Show,

    /// Switch to an unlocked level
    Set {
        /// Level number
        level: u32,
    },

    /// List unlocked levels in unlock order
    List,
}

fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("DRILL_DB") {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("drill");

    std::fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open(get_db_path())?;
    let key = RecordKey::new(cli.learner.clone(), cli.subject.clone());
    let mut sched = Scheduler::new(store, key, SystemClock)?;

    match cli.command {
        Commands::Record { concept, outcome } => {
            let outcome = AttemptOutcome::from_str(&outcome)
                .ok_or_else(|| format!("Invalid outcome '{}'. Use: correct or wrong", outcome))?;

            sched.record_attempt(&concept, outcome.is_correct())?;
            let unlocked = sched.check_level_progress()?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "concept": concept,
                        "outcome": outcome.as_str(),
                        "unlocked_level": unlocked
                    })))?
                );
            } else {
                println!("Recorded {} attempt at '{}'.", outcome.as_str(), concept);
                if let Some(level) = unlocked {
                    println!("Level {} unlocked!", level);
                }
            }
        }

        Commands::Next { concepts } => {
            let picked = sched.next_concept(&concepts).to_string();

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "concept": picked
                    })))?
                );
            } else {
                println!("{}", picked);
            }
        }

        Commands::Stats => {
            let stats = sched.stats();

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&stats))?);
            } else {
                println!("=== Practice Statistics ===");
                println!("Total attempts: {}", stats.total_attempts);
                println!("Total correct: {}", stats.total_correct);
                println!("Success rate: {}%", stats.success_rate);
                println!("Concepts mastered: {}", stats.concepts_mastered);
                println!("Current level: {}", stats.current_level);
                println!(
                    "Unlocked levels: {}",
                    stats
                        .unlocked_levels
                        .iter()
                        .map(|l| l.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }

        Commands::Check => {
            let unlocked = sched.check_level_progress()?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "unlocked_level": unlocked
                    })))?
                );
            } else if let Some(level) = unlocked {
                println!("Level {} unlocked!", level);
            } else {
                println!("No new level unlocked.");
            }
        }

        Commands::Level(level_cmd) => match level_cmd {
            LevelCommands::Show => {
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "current_level": sched.current_level()
                        })))?
                    );
                } else {
                    println!("Current level: {}", sched.current_level());
                }
            }

            LevelCommands::Set { level } => {
                if sched.set_current_level(level)? {
                    if cli.json {
                        println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                    } else {
                        println!("Switched to level {}.", level);
                    }
                } else if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::<()>::err(format!(
                            "Level {} is not unlocked",
                            level
                        )))?
                    );
                } else {
                    println!("Level {} is not unlocked.", level);
                }
            }

            LevelCommands::List => {
                let levels = sched.unlocked_levels();
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "unlocked_levels": levels
                        })))?
                    );
                } else {
                    println!(
                        "Unlocked levels: {}",
                        levels
                            .iter()
                            .map(|l| l.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
            }
        },

        Commands::Reset { yes } => {
            if !yes {
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::<()>::err(
                            "Pass --yes to confirm the reset"
                        ))?
                    );
                } else {
                    println!("This erases all progress for this learner and subject.");
                    println!("Pass --yes to confirm.");
                }
                return Ok(());
            }

            sched.reset()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Progress reset for {}/{}.", cli.learner, cli.subject);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    mod cli_parsing_tests {
        use super::*;

        #[test]
        fn parse_record_command() {
            let cli =
                Cli::try_parse_from(["drill", "record", "pair-3-7", "--outcome", "correct"])
                    .unwrap();
            match cli.command {
                Commands::Record { concept, outcome } => {
                    assert_eq!(concept, "pair-3-7");
                    assert_eq!(outcome, "correct");
                }
                _ => panic!("Expected Record command"),
            }
        }

        #[test]
        fn parse_record_short_flag() {
            let cli = Cli::try_parse_from(["drill", "record", "count-up", "-o", "wrong"]).unwrap();
            match cli.command {
                Commands::Record { concept, outcome } => {
                    assert_eq!(concept, "count-up");
                    assert_eq!(outcome, "wrong");
                }
                _ => panic!("Expected Record command"),
            }
        }

        #[test]
        fn parse_next_with_candidates() {
            let cli = Cli::try_parse_from(["drill", "next", "a", "b", "c"]).unwrap();
            match cli.command {
                Commands::Next { concepts } => {
                    assert_eq!(concepts, vec!["a", "b", "c"]);
                }
                _ => panic!("Expected Next command"),
            }
        }

        #[test]
        fn parse_next_requires_candidates() {
            assert!(Cli::try_parse_from(["drill", "next"]).is_err());
        }

        #[test]
        fn parse_stats_command() {
            let cli = Cli::try_parse_from(["drill", "stats"]).unwrap();
            assert!(matches!(cli.command, Commands::Stats));
        }

        #[test]
        fn parse_check_command() {
            let cli = Cli::try_parse_from(["drill", "check"]).unwrap();
            assert!(matches!(cli.command, Commands::Check));
        }

        #[test]
        fn parse_level_subcommands() {
            let cli = Cli::try_parse_from(["drill", "level", "show"]).unwrap();
            assert!(matches!(cli.command, Commands::Level(LevelCommands::Show)));

            let cli = Cli::try_parse_from(["drill", "level", "set", "2"]).unwrap();
            match cli.command {
                Commands::Level(LevelCommands::Set { level }) => assert_eq!(level, 2),
                _ => panic!("Expected Level Set command"),
            }

            let cli = Cli::try_parse_from(["drill", "level", "list"]).unwrap();
            assert!(matches!(cli.command, Commands::Level(LevelCommands::List)));
        }

        #[test]
        fn parse_reset_requires_flag_for_confirmation() {
            let cli = Cli::try_parse_from(["drill", "reset"]).unwrap();
            match cli.command {
                Commands::Reset { yes } => assert!(!yes),
                _ => panic!("Expected Reset command"),
            }

            let cli = Cli::try_parse_from(["drill", "reset", "--yes"]).unwrap();
            match cli.command {
                Commands::Reset { yes } => assert!(yes),
                _ => panic!("Expected Reset command"),
            }
        }

        #[test]
        fn parse_learner_and_subject_defaults() {
            let cli = Cli::try_parse_from(["drill", "stats"]).unwrap();
            assert_eq!(cli.learner, "default");
            assert_eq!(cli.subject, "default");
        }

        #[test]
        fn parse_learner_and_subject_flags() {
            let cli = Cli::try_parse_from([
                "drill",
                "stats",
                "--learner",
                "alice",
                "--subject",
                "addition",
            ])
            .unwrap();
            assert_eq!(cli.learner, "alice");
            assert_eq!(cli.subject, "addition");
        }

        #[test]
        fn parse_json_flag_global() {
            let cli1 = Cli::try_parse_from(["drill", "--json", "stats"]).unwrap();
            assert!(cli1.json);

            let cli2 = Cli::try_parse_from(["drill", "stats", "--json"]).unwrap();
            assert!(cli2.json);
        }

        #[test]
        fn parse_invalid_command_fails() {
            assert!(Cli::try_parse_from(["drill", "invalid"]).is_err());
        }

        #[test]
        fn parse_missing_required_arg_fails() {
            assert!(Cli::try_parse_from(["drill", "record"]).is_err());
            assert!(Cli::try_parse_from(["drill", "record", "concept"]).is_err());
            assert!(Cli::try_parse_from(["drill", "level", "set"]).is_err());
        }
    }

    mod db_path_tests {
        use super::*;
        use std::env;

        #[test]
        fn get_db_path_uses_env_var() {
            let test_path = "/tmp/test_drill.db";
            env::set_var("DRILL_DB", test_path);

            let path = get_db_path();
            assert_eq!(path.to_str().unwrap(), test_path);

            env::remove_var("DRILL_DB");
        }
    }
}
