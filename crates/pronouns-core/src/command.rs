//! Command grammar shared by the game and chat front-ends.
//!
//! ```text
//! [/][pronouns] set <pronouns...>
//! [/][pronouns] get [target]
//! [/][pronouns] clear | list | help
//! ```
//!
//! An empty command means `get` for the caller.

use thiserror::Error;

/// Subcommand names, in help order.
pub const SUBCOMMANDS: [&str; 5] = ["set", "get", "clear", "list", "help"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Raw pronoun input, parsed later by the registry.
    Set(String),
    /// Optional platform-specific target (another user).
    Get(Option<String>),
    Clear,
    List,
    Help,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set(_) => "set",
            Command::Get(_) => "get",
            Command::Clear => "clear",
            Command::List => "list",
            Command::Help => "help",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("usage: set <pronouns>, e.g. set she/her")]
    MissingPronouns,

    #[error("unknown subcommand '{0}', try help")]
    UnknownSubcommand(String),
}

pub fn parse_command(input: &str) -> Result<Command, CommandError> {
    let input = input.trim();
    let input = input.strip_prefix('/').unwrap_or(input);

    let mut words = input.split_whitespace().peekable();
    if words.peek().is_some_and(|w| w.eq_ignore_ascii_case("pronouns")) {
        words.next();
    }

    let Some(sub) = words.next() else {
        return Ok(Command::Get(None));
    };

    match sub.to_ascii_lowercase().as_str() {
        "set" => {
            let rest = words.collect::<Vec<_>>().join(" ");
            if rest.is_empty() {
                Err(CommandError::MissingPronouns)
            } else {
                Ok(Command::Set(rest))
            }
        }
        "get" | "show" => Ok(Command::Get(words.next().map(str::to_string))),
        "clear" => Ok(Command::Clear),
        "list" => Ok(Command::List),
        "help" => Ok(Command::Help),
        other => Err(CommandError::UnknownSubcommand(other.to_string())),
    }
}

/// Subcommands starting with `partial`, for tab completion.
pub fn complete(partial: &str) -> Vec<&'static str> {
    let partial = partial.trim().to_ascii_lowercase();
    SUBCOMMANDS
        .iter()
        .copied()
        .filter(|name| name.starts_with(&partial))
        .collect()
}

/// One line per subcommand, prefixed by however the front-end invokes us.
pub fn help_text(prefix: &str) -> String {
    [
        format!("{prefix}set <pronouns> - set your pronouns, e.g. she/her or he/they"),
        format!("{prefix}get [user] - show your or another user's pronouns"),
        format!("{prefix}clear - remove your pronouns"),
        format!("{prefix}list - show the predefined sets"),
        format!("{prefix}help - show this message"),
    ]
    .join("\n")
}
