//! Per-user ordering for commands that run in the background.
//!
//! Adapters reply before a command has run, so one user can have several
//! commands in flight. Each command takes a numbered [`Turn`] when it is
//! accepted and waits for the user's previous turn before it runs; the
//! user's commands therefore apply in the order they were sent. Different
//! users never wait on each other.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use pronouns_types::identity::PlatformId;
use tokio::sync::watch;

struct Lane {
    /// Last turn handed out.
    issued: u64,
    /// Last turn finished.
    done: Arc<watch::Sender<u64>>,
}

/// Turn dispenser, shared by clones.
#[derive(Clone, Default)]
pub struct UserQueue {
    lanes: Arc<DashMap<PlatformId, Lane>>,
}

impl UserQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next turn for `user`. Call this where the command is
    /// accepted, not inside the spawned task.
    pub fn enqueue(&self, user: &PlatformId) -> Turn {
        let mut lane = self.lanes.entry(user.clone()).or_insert_with(|| Lane {
            issued: 0,
            done: Arc::new(watch::channel(0).0),
        });
        lane.issued += 1;
        Turn {
            lanes: Arc::clone(&self.lanes),
            user: user.clone(),
            seq: lane.issued,
            done: Arc::clone(&lane.done),
        }
    }

    /// Users with a turn outstanding.
    pub fn active_users(&self) -> usize {
        self.lanes.len()
    }
}

/// One command's place in its user's lane.
pub struct Turn {
    lanes: Arc<DashMap<PlatformId, Lane>>,
    user: PlatformId,
    seq: u64,
    done: Arc<watch::Sender<u64>>,
}

impl Turn {
    /// Wait for the user's earlier turns, then run `fut`. The turn passes to
    /// the next command when this returns.
    pub async fn run<F: Future>(self, fut: F) -> F::Output {
        let mut finished = self.done.subscribe();
        let previous = self.seq - 1;
        // `self` holds the sender, so the channel cannot close here.
        let _ = finished.wait_for(|done| *done >= previous).await;
        fut.await
    }
}

impl Drop for Turn {
    fn drop(&mut self) {
        // Also runs if the command panicked, so the lane never stalls.
        let seq = self.seq;
        self.done.send_modify(|done| *done = (*done).max(seq));
        self.lanes.remove_if(&self.user, |_, lane| lane.issued == seq);
    }
}
