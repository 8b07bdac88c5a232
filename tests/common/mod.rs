//! Shared test infrastructure.
//!
//! # Setup
//! - `seed_group()` - memory store + one group of N numbered ideas
//! - `StoreApi` - `IdeaApi` that talks straight to a store, with failure injection
//! - `pg_store()` - Postgres store when `DATABASE_URL` is set

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};

use actix_web::ResponseError;
use async_trait::async_trait;

use ideaswipe::client::{ApiError, IdeaApi};
use ideaswipe::errors::AppError;
use ideaswipe::models::idea::{
    Idea, IdeaInput, IdeaPage, IdeaStore, MemoryIdeaStore, PgIdeaStore, VoteType,
};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const OWNER: &str = "owner-token";
pub const INTRUDER: &str = "someone-else";

// ============================================================================
// STORE SETUP
// ============================================================================

/// `count` ideas titled "Idea 0".."Idea {count-1}".
pub fn numbered_ideas(count: usize) -> Vec<IdeaInput> {
    (0..count)
        .map(|i| IdeaInput {
            title: format!("Idea {i}"),
            description: format!("Description {i}"),
        })
        .collect()
}

/// Memory store holding one group of `count` ideas owned by `OWNER`.
/// Returns (store, group_id).
pub async fn seed_group(count: usize) -> (MemoryIdeaStore, String) {
    let store = MemoryIdeaStore::new();
    let created = store
        .create_group(OWNER, &numbered_ideas(count))
        .await
        .expect("create group");
    (store, created.group_id)
}

/// Whole group in authoring order.
pub async fn all_ideas(store: &dyn IdeaStore, group_id: &str) -> Vec<Idea> {
    store
        .list_page(group_id, 0, 1_000)
        .await
        .expect("list group")
        .ideas
}

/// Postgres-backed store, or `None` when no database is configured.
pub async fn pg_store() -> Option<PgIdeaStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(16)
        .connect(&url)
        .await
        .expect("connect to DATABASE_URL");
    ideaswipe::db::run_migrations(&pool).await.expect("migrations");
    Some(PgIdeaStore::new(pool))
}

// ============================================================================
// FAKE HTTP BOUNDARY
// ============================================================================

fn to_api_error(e: AppError) -> ApiError {
    ApiError::Server {
        status: e.status_code().as_u16(),
        code: Some(e.code().to_string()),
        message: e.to_string(),
    }
}

/// `IdeaApi` that skips HTTP and calls the store directly.
///
/// The next `fail_votes` vote submissions fail with `fail_status` before
/// reaching the store, so a failed call never changes a counter.
pub struct StoreApi {
    pub store: MemoryIdeaStore,
    fail_votes: AtomicUsize,
    fail_status: u16,
    fail_pages: AtomicUsize,
    vote_delay: Duration,
    fetches: Mutex<Vec<usize>>,
    vote_calls: AtomicUsize,
}

impl StoreApi {
    pub fn new(store: MemoryIdeaStore) -> Self {
        Self {
            store,
            fail_votes: AtomicUsize::new(0),
            fail_status: 503,
            fail_pages: AtomicUsize::new(0),
            vote_delay: Duration::ZERO,
            fetches: Mutex::new(Vec::new()),
            vote_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_votes(store: MemoryIdeaStore, times: usize, status: u16) -> Self {
        let api = Self::new(store);
        api.fail_votes.store(times, Ordering::SeqCst);
        Self {
            fail_status: status,
            ..api
        }
    }

    /// Every vote call sleeps `delay` before reaching the store.
    pub fn slow_votes(store: MemoryIdeaStore, delay: Duration) -> Self {
        Self {
            vote_delay: delay,
            ..Self::new(store)
        }
    }

    /// The next `times` page requests fail with 503.
    pub fn fail_next_pages(&self, times: usize) {
        self.fail_pages.store(times, Ordering::SeqCst);
    }

    pub fn fail_next_votes(&self, times: usize) {
        self.fail_votes.store(times, Ordering::SeqCst);
    }

    /// Offsets of every page request, in order.
    pub fn fetch_offsets(&self) -> Vec<usize> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn vote_calls(&self) -> usize {
        self.vote_calls.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl IdeaApi for StoreApi {
    async fn list_page(
        &self,
        group_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<IdeaPage, ApiError> {
        self.fetches.lock().unwrap().push(offset);
        // Let a competing caller run while this request is "in flight".
        tokio::task::yield_now().await;
        if Self::take_failure(&self.fail_pages) {
            return Err(ApiError::Server {
                status: 503,
                code: None,
                message: "injected page failure".to_string(),
            });
        }
        self.store
            .list_page(group_id, offset as i64, limit as i64)
            .await
            .map_err(to_api_error)
    }

    async fn submit_vote(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, ApiError> {
        self.vote_calls.fetch_add(1, Ordering::SeqCst);
        if !self.vote_delay.is_zero() {
            tokio::time::sleep(self.vote_delay).await;
        }
        if Self::take_failure(&self.fail_votes) {
            return Err(ApiError::Server {
                status: self.fail_status,
                code: None,
                message: "injected failure".to_string(),
            });
        }
        self.store
            .submit_vote(shareable_id, vote)
            .await
            .map_err(to_api_error)
    }

    async fn undo_vote(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, ApiError> {
        self.store
            .undo_vote(shareable_id, vote)
            .await
            .map_err(to_api_error)
    }

    async fn record_view(&self, shareable_id: &str) -> Result<i64, ApiError> {
        self.store
            .increment_view(shareable_id)
            .await
            .map_err(to_api_error)
    }
}
