use crate::models::idea::{Idea, VoteType};

/// Transient record of a vote just cast, shown to the user and kept for undo.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteConfirmation {
    pub vote: VoteType,
    pub idea: Idea,
}

/// Single-slot undo buffer. Recording a new vote discards the previous one.
#[derive(Debug, Default)]
pub struct UndoController {
    last_vote: Option<VoteConfirmation>,
}

impl UndoController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, confirmation: VoteConfirmation) {
        self.last_vote = Some(confirmation);
    }

    pub fn last_vote(&self) -> Option<&VoteConfirmation> {
        self.last_vote.as_ref()
    }

    /// Take the pending reversal out of the slot.
    pub fn take(&mut self) -> Option<VoteConfirmation> {
        self.last_vote.take()
    }

    /// Put a reversal back after a failed undo, unless a newer vote took its place.
    pub fn restore(&mut self, confirmation: VoteConfirmation) {
        if self.last_vote.is_none() {
            self.last_vote = Some(confirmation);
        }
    }

    pub fn clear(&mut self) {
        self.last_vote = None;
    }
}
