//! Front-end adapters.
//!
//! [`Frontends`] bundles the resolver, preference service and pronoun
//! registry. It is built once at startup and shared by `Arc` between the
//! game adapter, the chat adapter and the HTTP layer. Each adapter turns its
//! platform's commands into calls on it and every outcome into a [`Reply`].

pub mod chat;
pub mod game;
pub mod queue;

use pronouns_types::error::StoreError;
use pronouns_types::identity::{Platform, PlatformId};
use pronouns_types::record::{FrontEnd, PreferenceRecord};
use serde::Serialize;

use crate::cache::CacheLookup;
use crate::command::{Command, help_text};
use crate::pronoun::{PronounEntry, PronounRegistry};
use crate::repository::identity::IdentityRepository;
use crate::repository::preference::PreferenceRepository;
use crate::service::preference::PreferenceService;
use crate::service::resolver::IdentityResolver;

/// Outcome of a front-end command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub success: bool,
    /// Display form of the pronouns involved, e.g. `She/Her, They/Them`.
    pub pronouns: Option<String>,
    pub message: String,
}

impl Reply {
    pub fn success(pronouns: Option<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            pronouns,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            pronouns: None,
            message: message.into(),
        }
    }

    /// User-facing text for a store failure.
    pub fn from_store_error(err: &StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::failure("No pronouns set."),
            StoreError::VersionConflict { .. } => {
                Self::failure("Your pronouns were changed elsewhere, please try again.")
            }
            StoreError::StorageUnavailable(_) => {
                Self::failure("Pronouns are temporarily unavailable, please try again shortly.")
            }
            StoreError::StorageCorrupt(reason) => {
                tracing::error!(%reason, "command failed on corrupt storage");
                Self::failure("Something went wrong. Please tell a server administrator.")
            }
        }
    }
}

/// Resolver, preference service and registry shared by every front-end.
pub struct Frontends<R: IdentityRepository, P: PreferenceRepository> {
    pub resolver: IdentityResolver<R>,
    pub preferences: PreferenceService<P>,
    pub registry: PronounRegistry,
}

impl<R: IdentityRepository, P: PreferenceRepository> Frontends<R, P> {
    pub fn new(
        resolver: IdentityResolver<R>,
        preferences: PreferenceService<P>,
        registry: PronounRegistry,
    ) -> Self {
        Self {
            resolver,
            preferences,
            registry,
        }
    }

    /// Run a parsed command for `caller`. Never fails: errors become
    /// failure replies.
    pub async fn execute(&self, caller: &PlatformId, command: Command, by: FrontEnd) -> Reply {
        tracing::debug!(caller = %caller, command = command.name(), by = %by, "executing command");
        match self.try_execute(caller, command, by).await {
            Ok(reply) => reply,
            Err(e) => Reply::from_store_error(&e),
        }
    }

    async fn try_execute(
        &self,
        caller: &PlatformId,
        command: Command,
        by: FrontEnd,
    ) -> Result<Reply, StoreError> {
        match command {
            Command::Set(input) => {
                let entries = match self.registry.parse_input(&input) {
                    Ok(entries) => entries,
                    Err(e) => return Ok(Reply::failure(capitalised_message(&e))),
                };
                self.write(caller, stored_form(&entries), by).await?;
                let display = self.registry.describe(&entries);
                Ok(Reply::success(
                    Some(display.clone()),
                    format!("Set your pronouns to {display}."),
                ))
            }
            Command::Clear => {
                self.write(caller, Vec::new(), by).await?;
                Ok(Reply::success(None, "Cleared your pronouns."))
            }
            Command::Get(None) => {
                let entries = self.entries_for(caller).await?;
                if entries.is_empty() {
                    return Ok(Reply::success(None, "You have not set any pronouns."));
                }
                let display = self.registry.describe(&entries);
                Ok(Reply::success(
                    Some(display.clone()),
                    format!("Your pronouns are {display}."),
                ))
            }
            Command::Get(Some(target)) => self.get_other(caller.platform, &target).await,
            Command::List => Ok(self.list()),
            Command::Help => Ok(Reply::success(None, help_text(""))),
        }
    }

    async fn get_other(&self, platform: Platform, target: &str) -> Result<Reply, StoreError> {
        let Some(target_id) = parse_target(platform, target) else {
            return Ok(Reply::failure(format!("'{target}' is not a known user.")));
        };
        // Looking someone up must not create an identity for them.
        let Some(identity) = self.resolver.find(&target_id).await? else {
            return Ok(Reply::success(None, format!("{target} has not set any pronouns.")));
        };
        let record = self.preferences.get_or_default(&identity).await?;
        let entries = self.registry.interpret(&record.pronouns);
        if entries.is_empty() {
            return Ok(Reply::success(None, format!("{target} has not set any pronouns.")));
        }
        let display = self.registry.describe(&entries);
        Ok(Reply::success(
            Some(display.clone()),
            format!("{target}'s pronouns are {display}."),
        ))
    }

    /// Predefined sets as a reply.
    pub fn list(&self) -> Reply {
        let names: Vec<String> = self
            .registry
            .predefined()
            .iter()
            .map(|set| set.formatted())
            .collect();
        Reply::success(None, format!("Available pronouns: {}", names.join(", ")))
    }

    /// Resolve `caller` and replace their pronoun list, retrying version
    /// conflicts.
    pub async fn write(
        &self,
        caller: &PlatformId,
        pronouns: Vec<String>,
        by: FrontEnd,
    ) -> Result<PreferenceRecord, StoreError> {
        let identity = self.resolver.resolve(caller).await?;
        self.preferences
            .update(&identity, by, move |_| pronouns.clone())
            .await
    }

    /// Current entries for a platform ID, creating its identity if new.
    pub async fn entries_for(&self, platform_id: &PlatformId) -> Result<Vec<PronounEntry>, StoreError> {
        let identity = self.resolver.resolve(platform_id).await?;
        let record = self.preferences.get_or_default(&identity).await?;
        Ok(self.registry.interpret(&record.pronouns))
    }

    /// Entries from the resolver memo and record cache only. `None` when
    /// either misses.
    pub fn cached_entries(&self, platform_id: &PlatformId) -> Option<Vec<PronounEntry>> {
        let identity = self.resolver.cached(platform_id)?;
        match self.preferences.get_cached(&identity) {
            CacheLookup::Hit(record) => Some(self.registry.interpret(&record.pronouns)),
            CacheLookup::Miss(_) => None,
        }
    }

    /// Drop the cached record for a platform ID, if its identity is known.
    pub fn forget(&self, platform_id: &PlatformId) {
        if let Some(identity) = self.resolver.cached(platform_id) {
            self.preferences.invalidate(&identity);
        }
    }
}

/// Stored representation of parsed entries.
pub fn stored_form(entries: &[PronounEntry]) -> Vec<String> {
    entries.iter().map(ToString::to_string).collect()
}

/// Accept a bare platform ID or a chat mention (`<@123>`, `<@!123>`).
fn parse_target(platform: Platform, raw: &str) -> Option<PlatformId> {
    let trimmed = raw.trim();
    let bare = trimmed
        .strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
        .map(|rest| rest.trim_start_matches('!'))
        .unwrap_or(trimmed);
    PlatformId::new(platform, bare).ok()
}

fn capitalised_message(err: &impl std::fmt::Display) -> String {
    let text = err.to_string();
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
        None => text,
    }
}
