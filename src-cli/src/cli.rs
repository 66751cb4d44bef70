//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "nyaya", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the configuration file (defaults to ./nyaya.toml).
    #[arg(short, long, env = "NYAYA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Chunk, embed and index the legal documents in a directory.
    Ingest {
        /// Document directory; defaults to `paths.documents_dir`.
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Taluk every ingested passage is tagged with.
        #[arg(long)]
        taluk: Option<String>,

        /// Pincode every ingested passage is tagged with.
        #[arg(long)]
        pincode: Option<String>,
    },

    /// Ask a legal question.
    Ask {
        question: String,

        /// Answer language: `en`/`english` or `kn`/`kannada`.
        #[arg(short, long)]
        language: Option<String>,

        /// Only consult passages tagged with this taluk.
        #[arg(short, long)]
        taluk: Option<String>,
    },

    /// Report configuration, index and Ollama status.
    Status,

    /// Rate an earlier answer from 1 to 5.
    Feedback {
        query_id: String,

        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,
    },

    /// Write all recorded feedback to a CSV file.
    ExportFeedback { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("nyaya").chain(args.iter().copied()))
    }

    #[test]
    fn parses_ask_with_language_and_taluk() {
        let args = parse(&[
            "ask",
            "What is an RTC?",
            "--language",
            "kn",
            "--taluk",
            "Mysuru",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Command::Ask {
                question: "What is an RTC?".to_string(),
                language: Some("kn".to_string()),
                taluk: Some("Mysuru".to_string()),
            }
        );
        assert!(!args.verbose);
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let args = parse(&["status", "--verbose", "--config", "/etc/nyaya.toml"]).unwrap();
        assert_eq!(args.command, Command::Status);
        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("/etc/nyaya.toml")));
    }

    #[test]
    fn parses_ingest_tags() {
        let args = parse(&[
            "ingest", "--dir", "docs", "--taluk", "Hunsur", "--pincode", "571105",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Command::Ingest {
                dir: Some(PathBuf::from("docs")),
                taluk: Some("Hunsur".to_string()),
                pincode: Some("571105".to_string()),
            }
        );
    }

    #[test]
    fn rating_must_be_one_to_five() {
        assert!(parse(&["feedback", "abc123", "0"]).is_err());
        assert!(parse(&["feedback", "abc123", "6"]).is_err());
        let args = parse(&["feedback", "abc123", "4"]).unwrap();
        assert_eq!(
            args.command,
            Command::Feedback {
                query_id: "abc123".to_string(),
                rating: 4,
            }
        );
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(parse(&["status", "-v", "-q"]).is_err());
    }

    #[test]
    fn question_is_required() {
        assert!(parse(&["ask"]).is_err());
    }
}
