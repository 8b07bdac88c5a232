use std::collections::{HashMap, VecDeque};

use crate::models::idea::{Idea, VoteType};

/// A vote whose submission failed transiently and is waiting to be resent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVote {
    pub shareable_id: String,
    pub vote: VoteType,
    /// Resend attempts made so far (informational, there is no cap).
    pub attempts: u32,
}

impl PendingVote {
    pub fn new(shareable_id: impl Into<String>, vote: VoteType) -> Self {
        Self {
            shareable_id: shareable_id.into(),
            vote,
            attempts: 0,
        }
    }
}

/// FIFO of failed vote submissions, owned by one session. Lives in memory only.
#[derive(Debug, Default)]
pub struct RetryQueue {
    entries: VecDeque<PendingVote>,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: PendingVote) {
        self.entries.push_back(entry);
    }

    /// Oldest entry first.
    pub fn pop(&mut self) -> Option<PendingVote> {
        self.entries.pop_front()
    }

    /// Put an entry back, at the tail, after another failed attempt.
    pub fn requeue(&mut self, mut entry: PendingVote) {
        entry.attempts += 1;
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingVote> {
        self.entries.iter()
    }
}

/// Last server-confirmed record per idea, keyed by `shareable_id`.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<String, Idea>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, idea: Idea) {
        self.entries.insert(idea.shareable_id.clone(), idea);
    }

    pub fn get(&self, shareable_id: &str) -> Option<&Idea> {
        self.entries.get(shareable_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
