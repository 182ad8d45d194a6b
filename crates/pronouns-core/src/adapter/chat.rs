//! Chat-bot front-end.
//!
//! Messages starting with the configured prefix are commands. Reads are
//! answered after the store responds. Writes are acknowledged as soon as the
//! input parses, and the write itself runs in the background with conflict
//! retries; a write that still fails is logged rather than replied to.
//!
//! Each author's commands run in the order they were sent, so a read sees
//! the author's earlier writes and the last write sent is the one stored.

use std::sync::Arc;

use pronouns_types::identity::PlatformId;
use pronouns_types::record::FrontEnd;
use tokio_util::task::TaskTracker;

use super::queue::UserQueue;
use super::{Frontends, Reply, capitalised_message, stored_form};
use crate::command::{Command, help_text, parse_command};
use crate::repository::identity::IdentityRepository;
use crate::repository::preference::PreferenceRepository;

pub struct ChatAdapter<R: IdentityRepository, P: PreferenceRepository> {
    frontends: Arc<Frontends<R, P>>,
    prefix: String,
    tracker: TaskTracker,
    queue: UserQueue,
}

impl<R, P> ChatAdapter<R, P>
where
    R: IdentityRepository + 'static,
    P: PreferenceRepository + 'static,
{
    pub fn new(frontends: Arc<Frontends<R, P>>, prefix: impl Into<String>) -> Self {
        Self {
            frontends,
            prefix: prefix.into(),
            tracker: TaskTracker::new(),
            queue: UserQueue::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Handle one chat message from `snowflake`.
    ///
    /// `None` means the message was not a command and should be ignored.
    pub async fn handle_message(&self, snowflake: &str, text: &str) -> Option<Reply> {
        let body = text.trim_start().strip_prefix(self.prefix.as_str())?;

        let author = match PlatformId::chat(snowflake) {
            Ok(author) => author,
            Err(e) => return Some(Reply::failure(capitalised_message(&e))),
        };
        let command = match parse_command(body) {
            Ok(command) => command,
            Err(e) => return Some(Reply::failure(capitalised_message(&e))),
        };

        let reply = match command {
            Command::Help => Reply::success(None, help_text(&self.prefix)),
            Command::Set(input) => match self.frontends.registry.parse_input(&input) {
                Ok(entries) => {
                    let display = self.frontends.registry.describe(&entries);
                    self.spawn_write(author, stored_form(&entries));
                    Reply::success(Some(display.clone()), format!("Set your pronouns to {display}."))
                }
                Err(e) => Reply::failure(capitalised_message(&e)),
            },
            Command::Clear => {
                self.spawn_write(author, Vec::new());
                Reply::success(None, "Cleared your pronouns.")
            }
            other => {
                self.queue
                    .enqueue(&author)
                    .run(self.frontends.execute(&author, other, FrontEnd::Chat))
                    .await
            }
        };
        Some(reply)
    }

    fn spawn_write(&self, author: PlatformId, pronouns: Vec<String>) {
        let frontends = Arc::clone(&self.frontends);
        let turn = self.queue.enqueue(&author);
        self.tracker.spawn(async move {
            let result = turn
                .run(frontends.write(&author, pronouns, FrontEnd::Chat))
                .await;
            match result {
                Ok(record) => {
                    tracing::debug!(user = %author, version = record.version, "chat write applied");
                }
                Err(e) => {
                    tracing::warn!(user = %author, error = %e, "chat write failed after reply was sent");
                }
            }
        });
    }

    /// Wait for every pending background write.
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop accepting background writes and wait for what is queued.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
