//! CLI command definitions and parsing
use crate::lesson::{Pace, SssLevel};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sss-tutor",
    version,
    about = "Curriculum-grounded lesson notes for Senior Secondary School students",
    long_about = "sss-tutor indexes SSS syllabus documents per subject, keeps the indexes cached on disk \
                  until the source document changes, and generates pace-tailored lesson notes with \
                  retrieval-augmented generation over an HTTP API or the command line."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/sss-tutor/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Force a rebuild of a subject's index
    Rebuild {
        /// Subject name (defaults to the configured default subject)
        #[arg(short, long)]
        subject: Option<String>,
    },

    /// Show cached index metadata for a subject
    Status {
        /// Subject name (defaults to the configured default subject)
        #[arg(short, long)]
        subject: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate one lesson and print it
    Lesson {
        /// Lesson topic, e.g. "Quadratic Equations"
        #[arg(short, long)]
        topic: String,

        /// SSS level: 1, 2 or 3
        #[arg(short, long)]
        level: SssLevel,

        /// Learning pace: low, moderate or advance
        #[arg(short, long)]
        pace: Pace,

        /// Subject name (defaults to the configured default subject)
        #[arg(short, long)]
        subject: Option<String>,
    },

    /// List configured and discovered subjects
    Subjects,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_lesson_arguments_parse() {
        let cli = Cli::try_parse_from([
            "sss-tutor",
            "lesson",
            "--topic",
            "Quadratic Equations",
            "--level",
            "2",
            "--pace",
            "moderate",
        ])
        .unwrap();

        match cli.command {
            Commands::Lesson {
                topic,
                level,
                pace,
                subject,
            } => {
                assert_eq!(topic, "Quadratic Equations");
                assert_eq!(level, SssLevel::Sss2);
                assert_eq!(pace, Pace::Moderate);
                assert!(subject.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_pace_is_rejected() {
        let result = Cli::try_parse_from([
            "sss-tutor", "lesson", "--topic", "Sets", "--level", "1", "--pace", "fast",
        ]);
        assert!(result.is_err());
    }
}
