//! CLI command definitions for the `pronouns` binary.
//!
//! Uses clap derive macros for argument parsing. Every command works on the
//! local database directly; `serve` exposes the same operations over HTTP.

pub mod config;
pub mod identity;
pub mod preference;
pub mod run;
pub mod status;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Pronoun preferences shared between a game server and a chat bot.
#[derive(Parser)]
#[command(name = "pronouns", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Platform a user ID belongs to.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PlatformArg {
    Game,
    Chat,
}

impl From<PlatformArg> for pronouns_types::identity::Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Game => pronouns_types::identity::Platform::Game,
            PlatformArg::Chat => pronouns_types::identity::Platform::Chat,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a platform ID to its identity, creating it if new.
    Resolve {
        platform: PlatformArg,
        id: String,
    },

    /// Point a platform ID at an existing identity (records are not merged).
    Link {
        platform: PlatformArg,
        id: String,
        /// Identity UUID to link to.
        identity: String,
    },

    /// Show a user's pronouns.
    Get {
        platform: PlatformArg,
        id: String,
    },

    /// Set a user's pronouns, e.g. `pronouns set game alex she/her they`.
    Set {
        platform: PlatformArg,
        id: String,
        /// Pronouns in user syntax: subjectives, `any`, `ask`, or a full six-form set.
        #[arg(required = true, num_args = 1..)]
        pronouns: Vec<String>,
        /// Fail instead of overwriting unless the record is at this version.
        #[arg(long)]
        expect_version: Option<u64>,
    },

    /// Clear a user's pronouns. History is kept.
    Clear {
        platform: PlatformArg,
        id: String,
        /// Fail instead of clearing unless the record is at this version.
        #[arg(long)]
        expect_version: Option<u64>,
    },

    /// Show every write to a user's record.
    History {
        platform: PlatformArg,
        id: String,
    },

    /// List stored records, most recently updated first.
    #[command(alias = "ls")]
    List {
        #[arg(long, default_value = "50")]
        limit: i64,
        #[arg(long, default_value = "0")]
        offset: i64,
    },

    /// List predefined pronoun sets.
    Sets,

    /// Run a front-end command as a game player or chat user.
    Run {
        platform: PlatformArg,
        id: String,
        /// Command text, e.g. `set she/her` or `get`.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// System status.
    Status,

    /// Start the REST API server.
    Serve {
        /// Port to listen on. Defaults to `server.port` from config.
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to. Defaults to `server.host` from config.
        #[arg(long)]
        host: Option<String>,
    },

    /// Write a starter pronouns.toml into the data directory.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_set_with_expected_version() {
        let cli = Cli::try_parse_from([
            "pronouns", "set", "game", "uuid-123", "they/them", "--expect-version", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Set {
                id,
                pronouns,
                expect_version,
                ..
            } => {
                assert_eq!(id, "uuid-123");
                assert_eq!(pronouns, vec!["they/them"]);
                assert_eq!(expect_version, Some(3));
            }
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn global_flags_anywhere() {
        let cli = Cli::try_parse_from(["pronouns", "sets", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }
}
