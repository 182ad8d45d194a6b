//! Game-server front-end.
//!
//! The game server calls in from its tick thread, which must never wait on
//! storage. Commands are handed to the tokio runtime and answered through a
//! oneshot channel, one player's commands in the order they were submitted.
//! Placeholders are served from the cache alone, with a background fetch
//! queued on a miss.

use std::sync::Arc;

use dashmap::DashSet;
use pronouns_types::identity::PlatformId;
use pronouns_types::record::FrontEnd;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::task::TaskTracker;

use super::queue::UserQueue;
use super::{Frontends, Reply, capitalised_message};
use crate::command::{self, Command, help_text, parse_command};
use crate::placeholder;
use crate::repository::identity::IdentityRepository;
use crate::repository::preference::PreferenceRepository;

const COMMAND_PREFIX: &str = "/pronouns ";

pub struct GameAdapter<R: IdentityRepository, P: PreferenceRepository> {
    frontends: Arc<Frontends<R, P>>,
    runtime: Handle,
    tracker: TaskTracker,
    queue: UserQueue,
    /// Players with a cache warm-up in flight.
    warming: Arc<DashSet<PlatformId>>,
}

impl<R, P> GameAdapter<R, P>
where
    R: IdentityRepository + 'static,
    P: PreferenceRepository + 'static,
{
    /// `runtime` is where background work runs; the caller's thread need
    /// not be inside it.
    pub fn new(frontends: Arc<Frontends<R, P>>, runtime: Handle) -> Self {
        Self {
            frontends,
            runtime,
            tracker: TaskTracker::new(),
            queue: UserQueue::new(),
            warming: Arc::new(DashSet::new()),
        }
    }

    /// Queue a player command. Returns immediately; the reply arrives on
    /// the receiver.
    pub fn submit(&self, uuid: &str, text: &str) -> oneshot::Receiver<Reply> {
        let player = match PlatformId::game(uuid) {
            Ok(player) => player,
            Err(e) => return answered(Reply::failure(capitalised_message(&e))),
        };
        let command = match parse_command(text) {
            Ok(Command::Help) => return answered(Reply::success(None, help_text(COMMAND_PREFIX))),
            Ok(Command::List) => return answered(self.frontends.list()),
            Ok(command) => command,
            Err(e) => return answered(Reply::failure(capitalised_message(&e))),
        };

        let (tx, rx) = oneshot::channel();
        let frontends = Arc::clone(&self.frontends);
        let turn = self.queue.enqueue(&player);
        self.tracker.spawn_on(
            async move {
                let reply = turn
                    .run(frontends.execute(&player, command, FrontEnd::Game))
                    .await;
                if tx.send(reply).is_err() {
                    tracing::debug!(player = %player, "game command reply dropped");
                }
            },
            &self.runtime,
        );
        rx
    }

    /// Render a placeholder for a player without touching storage.
    ///
    /// On a cache miss the default set is rendered and a fetch is queued, so
    /// a later tick sees the real value.
    pub fn placeholder(&self, uuid: &str, identifier: &str) -> String {
        let Ok(player) = PlatformId::game(uuid) else {
            return String::new();
        };
        let entries = match self.frontends.cached_entries(&player) {
            Some(entries) => entries,
            None => {
                self.warm(player);
                Vec::new()
            }
        };
        placeholder::render(identifier, &entries, self.frontends.registry.default_set())
            .unwrap_or_default()
    }

    fn warm(&self, player: PlatformId) {
        if !self.warming.insert(player.clone()) {
            return;
        }
        let frontends = Arc::clone(&self.frontends);
        let warming = Arc::clone(&self.warming);
        self.tracker.spawn_on(
            async move {
                if let Err(e) = frontends.entries_for(&player).await {
                    tracing::debug!(player = %player, error = %e, "placeholder warm-up failed");
                }
                warming.remove(&player);
            },
            &self.runtime,
        );
    }

    /// Player left: drop their cached record.
    pub fn on_player_quit(&self, uuid: &str) {
        if let Ok(player) = PlatformId::game(uuid) {
            self.frontends.forget(&player);
        }
    }

    /// Subcommand names for tab completion.
    pub fn complete(&self, partial: &str) -> Vec<&'static str> {
        command::complete(partial)
    }

    /// Wait for every queued command and warm-up to finish.
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop accepting background work and wait for what is queued.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// Receiver that already holds its reply.
fn answered(reply: Reply) -> oneshot::Receiver<Reply> {
    let (tx, rx) = oneshot::channel();
    // The receiver is still in hand, so this cannot fail.
    let _ = tx.send(reply);
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::tests::{TestFrontends, frontends};

    const PLAYER: &str = "0f3e2b7c-8a1d-4c55-9e0b-2d3f4a5b6c7d";

    fn adapter() -> GameAdapter<
        crate::testing::MemoryIdentityRepository,
        crate::testing::MemoryPreferenceRepository,
    > {
        GameAdapter::new(frontends(), Handle::current())
    }

    #[tokio::test]
    async fn submit_set_and_get() {
        let game = adapter();

        let reply = game.submit(PLAYER, "/pronouns set she/her").await.unwrap();
        assert!(reply.success, "{reply:?}");
        assert_eq!(reply.pronouns.as_deref(), Some("She/Her"));

        let reply = game.submit(PLAYER, "/pronouns").await.unwrap();
        assert_eq!(reply.pronouns.as_deref(), Some("She/Her"));
    }

    #[tokio::test]
    async fn help_and_errors_answer_without_spawning() {
        let game = adapter();

        let reply = game.submit(PLAYER, "help").await.unwrap();
        assert!(reply.message.contains("/pronouns set"));

        let reply = game.submit(PLAYER, "frobnicate").await.unwrap();
        assert!(!reply.success);

        let reply = game.submit("has space", "get").await.unwrap();
        assert!(!reply.success);
    }

    #[tokio::test]
    async fn placeholder_warms_cache_on_miss() {
        let game = adapter();
        game.submit(PLAYER, "set he/him").await.unwrap();

        // The write invalidated the cache; the first render falls back.
        assert_eq!(game.placeholder(PLAYER, "pronouns"), "They/Them");

        game.flush().await;
        assert_eq!(game.placeholder(PLAYER, "pronouns"), "He/Him");
        assert_eq!(game.placeholder(PLAYER, "objective_upper"), "HIM");
        assert_eq!(game.placeholder(PLAYER, "nonsense"), "");
    }

    #[tokio::test]
    async fn quit_invalidates_cached_record() {
        let game = adapter();
        game.submit(PLAYER, "set xe").await.unwrap();
        game.placeholder(PLAYER, "pronouns");
        game.flush().await;
        assert_eq!(game.placeholder(PLAYER, "subjective"), "xe");

        game.on_player_quit(PLAYER);
        assert_eq!(game.placeholder(PLAYER, "subjective"), "they");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn commands_apply_in_submission_order() {
        let f = frontends();
        *f.preferences.repository().delay.lock().unwrap() = Some(std::time::Duration::from_millis(2));
        let game = GameAdapter::new(Arc::clone(&f), Handle::current());

        let set = game.submit(PLAYER, "set she");
        let clear = game.submit(PLAYER, "clear");
        let get = game.submit(PLAYER, "get");

        assert!(set.await.unwrap().success);
        assert!(clear.await.unwrap().success);
        let reply = get.await.unwrap();
        assert_eq!(reply.pronouns, None);

        let identity = f.resolver.cached(&PlatformId::game(PLAYER).unwrap()).unwrap();
        let record = f.preferences.get(&identity).await.unwrap();
        assert!(record.pronouns.is_empty());
        assert_eq!(record.version, 2);
    }

    #[tokio::test]
    async fn flush_allows_further_work() {
        let game = adapter();
        game.flush().await;
        let reply = game.submit(PLAYER, "set fae").await.unwrap();
        assert!(reply.success);
    }

    #[test]
    fn completes_subcommands() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let f: Arc<TestFrontends> = frontends();
        let game = GameAdapter::new(f, runtime.handle().clone());
        assert_eq!(game.complete("s"), vec!["set"]);
    }
}
