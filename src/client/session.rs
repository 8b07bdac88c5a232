//! One visitor's voting session over a group.
//!
//! The session owns the feed cursor, the single-slot undo buffer, the retry
//! queue and the response cache. Votes are applied optimistically: the cursor
//! moves forward after the confirmation delay whether or not the server call
//! succeeded, and transient failures are parked in the retry queue for the
//! background loop to resend.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::api::{ApiError, IdeaApi};
use super::cursor::{FeedCursor, Position};
use super::retry::{PendingVote, ResponseCache, RetryQueue};
use super::undo::{UndoController, VoteConfirmation};
use crate::models::idea::{Idea, VoteType};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Ideas requested per page.
    pub batch_size: usize,
    /// How long a vote confirmation stays visible before the cursor moves on.
    pub display_delay: Duration,
    pub retry_interval: Duration,
    pub vote_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            batch_size: 10,
            display_delay: Duration::from_millis(800),
            retry_interval: Duration::from_secs(5),
            vote_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Another vote or an undo is still in flight.
    Busy,
    /// Every idea of the group has been voted through.
    Exhausted,
    /// The next page has not arrived yet; the fetch was retried and failed.
    Pending,
    Recorded(Idea),
    /// The server could not be reached; the vote waits in the retry queue.
    Deferred,
    /// The server refused the vote (4xx). Not retried, not undoable.
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UndoOutcome {
    Nothing,
    Busy,
    Undone(Idea),
    Failed(String),
}

/// Point-in-time view of the session for rendering.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub current: Option<Idea>,
    pub index: usize,
    pub loaded: usize,
    pub has_more: bool,
    pub exhausted: bool,
    pub confirmation: Option<VoteConfirmation>,
    pub has_retries: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    Voting,
    Undoing,
}

struct SessionState {
    cursor: FeedCursor,
    confirmation: Option<VoteConfirmation>,
    undo: UndoController,
    retries: RetryQueue,
    cache: ResponseCache,
    rng: Box<dyn RngCore + Send>,
    in_flight: Option<Activity>,
}

/// Clears the in-flight marker when a vote or undo finishes or is dropped mid-await.
struct InFlight<'a> {
    state: &'a Mutex<SessionState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.in_flight = None;
        state.confirmation = None;
    }
}

pub struct VotingSession {
    group_id: String,
    api: Arc<dyn IdeaApi>,
    config: ClientConfig,
    state: Mutex<SessionState>,
}

impl VotingSession {
    pub fn new(group_id: impl Into<String>, api: Arc<dyn IdeaApi>, config: ClientConfig) -> Self {
        Self::with_rng(group_id, api, config, StdRng::from_os_rng())
    }

    /// Session with a caller-supplied shuffle source, e.g. a seeded `StdRng` in tests.
    pub fn with_rng<R: RngCore + Send + 'static>(
        group_id: impl Into<String>,
        api: Arc<dyn IdeaApi>,
        config: ClientConfig,
        rng: R,
    ) -> Self {
        Self::from_parts(
            group_id,
            api,
            config,
            Box::new(rng),
            RetryQueue::new(),
            ResponseCache::new(),
        )
    }

    pub fn from_parts(
        group_id: impl Into<String>,
        api: Arc<dyn IdeaApi>,
        config: ClientConfig,
        rng: Box<dyn RngCore + Send>,
        retries: RetryQueue,
        cache: ResponseCache,
    ) -> Self {
        let cursor = FeedCursor::new(config.batch_size);
        Self {
            group_id: group_id.into(),
            api,
            config,
            state: Mutex::new(SessionState {
                cursor,
                confirmation: None,
                undo: UndoController::new(),
                retries,
                cache,
                rng,
                in_flight: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ── Feed ────────────────────────────────────────────────────────

    /// Load the first page. Errors here are surfaced: there is nothing to show yet.
    pub async fn start(&self) -> Result<(), ApiError> {
        self.load_more().await?;
        // Tiny batches can already sit inside the prefetch window.
        self.load_more().await?;
        Ok(())
    }

    /// Fetch and append the next page if the cursor is near the end.
    ///
    /// Returns `Ok(false)` when no fetch was due or one is already running.
    pub async fn load_more(&self) -> Result<bool, ApiError> {
        let Some(offset) = self.lock().cursor.begin_fetch() else {
            return Ok(false);
        };

        let limit = self.config.batch_size;
        match self.api.list_page(&self.group_id, offset, limit).await {
            Ok(page) => {
                let mut guard = self.lock();
                let state = &mut *guard;
                log::debug!(
                    "Loaded {} ideas of group {} at offset {}",
                    page.ideas.len(),
                    self.group_id,
                    offset
                );
                state.cursor.complete_fetch(page, &mut *state.rng);
                Ok(true)
            }
            Err(e) => {
                log::warn!("Failed to load group {} at offset {}: {}", self.group_id, offset, e);
                self.lock().cursor.fail_fetch();
                Err(e)
            }
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.lock();
        let (current, exhausted) = match state.cursor.current() {
            Position::Idea(idea) => (Some(idea.clone()), false),
            Position::Pending => (None, false),
            Position::Exhausted => (None, true),
        };
        FeedSnapshot {
            current,
            index: state.cursor.index(),
            loaded: state.cursor.sequence().len(),
            has_more: state.cursor.has_more(),
            exhausted,
            confirmation: state.confirmation.clone(),
            has_retries: !state.retries.is_empty(),
        }
    }

    pub fn current(&self) -> Option<Idea> {
        self.lock().cursor.current_idea().cloned()
    }

    /// Run `f` against the cursor, for inspection.
    pub fn with_cursor<T>(&self, f: impl FnOnce(&FeedCursor) -> T) -> T {
        f(&self.lock().cursor)
    }

    /// Whether `creator_id` owns the group being voted on.
    pub fn is_owner(&self, creator_id: &str) -> bool {
        self.lock().cursor.owner_id() == Some(creator_id)
    }

    /// Count a view of the idea under the cursor. Failures are logged only.
    pub async fn record_view(&self) -> Option<i64> {
        let shareable_id = self.lock().cursor.current_idea()?.shareable_id.clone();
        match self.api.record_view(&shareable_id).await {
            Ok(views) => {
                self.lock().cursor.set_views(&shareable_id, views);
                Some(views)
            }
            Err(e) => {
                log::warn!("Failed to record view of {}: {}", shareable_id, e);
                None
            }
        }
    }

    // ── Votes ───────────────────────────────────────────────────────

    pub fn is_voting(&self) -> bool {
        self.lock().in_flight == Some(Activity::Voting)
    }

    pub fn confirmation(&self) -> Option<VoteConfirmation> {
        self.lock().confirmation.clone()
    }

    pub fn last_vote(&self) -> Option<VoteConfirmation> {
        self.lock().undo.last_vote().cloned()
    }

    async fn call_vote(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, ApiError> {
        tokio::time::timeout(self.config.vote_timeout, self.api.submit_vote(shareable_id, vote))
            .await
            .unwrap_or(Err(ApiError::Timeout(self.config.vote_timeout)))
    }

    async fn call_undo(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, ApiError> {
        tokio::time::timeout(self.config.vote_timeout, self.api.undo_vote(shareable_id, vote))
            .await
            .unwrap_or(Err(ApiError::Timeout(self.config.vote_timeout)))
    }

    /// Vote on the idea under the cursor.
    ///
    /// The cursor advances after `display_delay` regardless of the server result.
    pub async fn submit(&self, vote: VoteType) -> SubmitOutcome {
        // A page fetch that failed earlier left the cursor waiting at the end of
        // the loaded ideas; run the growth trigger again before giving up.
        let waiting = matches!(self.lock().cursor.current(), Position::Pending);
        if waiting {
            if let Err(e) = self.load_more().await {
                log::warn!("Page fetch for group {} still failing: {}", self.group_id, e);
            }
        }

        let idea = {
            let mut guard = self.lock();
            let state = &mut *guard;
            if state.in_flight.is_some() {
                return SubmitOutcome::Busy;
            }
            let idea = match state.cursor.current() {
                Position::Idea(idea) => idea.clone(),
                Position::Pending => return SubmitOutcome::Pending,
                Position::Exhausted => return SubmitOutcome::Exhausted,
            };

            state.in_flight = Some(Activity::Voting);
            let confirmation = VoteConfirmation {
                vote,
                idea: idea.clone(),
            };
            state.confirmation = Some(confirmation.clone());
            state.undo.record(confirmation);

            // Show the expected counters right away when the server state is known.
            if let Some(cached) = state.cache.get(&idea.shareable_id) {
                let preview = cached.with_vote(vote);
                state.cursor.merge(&preview);
            }
            idea
        };
        let in_flight = InFlight { state: &self.state };

        let outcome = match self.call_vote(&idea.shareable_id, vote).await {
            Ok(updated) => {
                let mut state = self.lock();
                state.cursor.merge(&updated);
                state.cache.insert(updated.clone());
                SubmitOutcome::Recorded(updated)
            }
            Err(e) if e.is_transient() => {
                log::warn!(
                    "Vote {} on {} deferred to retry queue: {}",
                    vote,
                    idea.shareable_id,
                    e
                );
                self.lock()
                    .retries
                    .push(PendingVote::new(idea.shareable_id.clone(), vote));
                SubmitOutcome::Deferred
            }
            Err(e) => {
                log::warn!("Vote {} on {} rejected: {}", vote, idea.shareable_id, e);
                // Nothing was counted, so there is nothing to undo.
                self.lock().undo.clear();
                SubmitOutcome::Rejected(e.to_string())
            }
        };

        tokio::time::sleep(self.config.display_delay).await;
        self.lock().cursor.advance();
        drop(in_flight);

        if let Err(e) = self.load_more().await {
            log::warn!("Background page fetch failed: {}", e);
        }

        outcome
    }

    // ── Undo ────────────────────────────────────────────────────────

    /// Reverse the most recent vote: decrement it on the server and step back.
    pub async fn undo(&self) -> UndoOutcome {
        let last = {
            let mut state = self.lock();
            if state.in_flight.is_some() {
                return UndoOutcome::Busy;
            }
            let Some(last) = state.undo.take() else {
                return UndoOutcome::Nothing;
            };
            state.in_flight = Some(Activity::Undoing);
            last
        };
        let in_flight = InFlight { state: &self.state };

        let result = self.call_undo(&last.idea.shareable_id, last.vote).await;
        let outcome = {
            let mut state = self.lock();
            match result {
                Ok(updated) => {
                    state.cursor.merge(&updated);
                    state.cache.insert(updated.clone());
                    state.cursor.retreat();
                    UndoOutcome::Undone(updated)
                }
                Err(e) => {
                    log::warn!(
                        "Undo of {} on {} failed: {}",
                        last.vote,
                        last.idea.shareable_id,
                        e
                    );
                    state.undo.restore(last);
                    UndoOutcome::Failed(e.to_string())
                }
            }
        };
        drop(in_flight);
        outcome
    }

    // ── Retries ─────────────────────────────────────────────────────

    pub fn has_retries(&self) -> bool {
        !self.lock().retries.is_empty()
    }

    pub fn pending_retries(&self) -> Vec<PendingVote> {
        self.lock().retries.iter().cloned().collect()
    }

    /// Resend the oldest queued vote once.
    ///
    /// Returns `None` when the queue is empty, otherwise whether the resend landed.
    /// Transient failures go back in the queue; refusals are dropped.
    pub async fn retry_pending(&self) -> Option<bool> {
        let entry = self.lock().retries.pop()?;

        match self.call_vote(&entry.shareable_id, entry.vote).await {
            Ok(updated) => {
                log::info!(
                    "Retried vote {} on {} after {} failed attempts",
                    entry.vote,
                    entry.shareable_id,
                    entry.attempts + 1
                );
                let mut state = self.lock();
                state.cursor.merge(&updated);
                state.cache.insert(updated);
                Some(true)
            }
            Err(e) if e.is_transient() => {
                log::warn!("Retry of vote {} on {} failed: {}", entry.vote, entry.shareable_id, e);
                self.lock().retries.requeue(entry);
                Some(false)
            }
            Err(e) => {
                log::warn!(
                    "Dropping queued vote {} on {}: {}",
                    entry.vote,
                    entry.shareable_id,
                    e
                );
                Some(false)
            }
        }
    }

    /// Resend one queued vote every `retry_interval` until the session is dropped.
    pub fn spawn_retry_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::downgrade(self);
        let period = self.config.retry_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(session) = session.upgrade() else {
                    break;
                };
                session.retry_pending().await;
            }
        })
    }
}
