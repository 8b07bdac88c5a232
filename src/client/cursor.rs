use rand::Rng;
use rand::seq::SliceRandom;

use crate::models::idea::{Idea, IdeaPage};

/// Fetch the next page once the pointer is this close to the end.
const PREFETCH_DISTANCE: usize = 2;

/// What the cursor points at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position<'a> {
    Idea(&'a Idea),
    /// Past the loaded ideas but the server has more; a fetch is due or in flight.
    Pending,
    /// Every idea of the group has been consumed.
    Exhausted,
}

/// Client-local pointer into a lazily grown, per-page shuffled sequence of ideas.
///
/// The cursor does no I/O. Callers ask [`FeedCursor::begin_fetch`] for the next
/// offset to load and hand the page back through [`FeedCursor::complete_fetch`].
#[derive(Debug, Clone)]
pub struct FeedCursor {
    batch_size: usize,
    sequence: Vec<Idea>,
    index: usize,
    has_more: bool,
    is_loading_more: bool,
    group_title: String,
    owner_id: Option<String>,
}

impl FeedCursor {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            sequence: Vec::new(),
            index: 0,
            has_more: true,
            is_loading_more: false,
            group_title: String::new(),
            owner_id: None,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn sequence(&self) -> &[Idea] {
        &self.sequence
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading_more(&self) -> bool {
        self.is_loading_more
    }

    pub fn group_title(&self) -> &str {
        &self.group_title
    }

    /// Owner token of the group, known once the first page arrived.
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn current(&self) -> Position<'_> {
        match self.sequence.get(self.index) {
            Some(idea) => Position::Idea(idea),
            None if self.has_more => Position::Pending,
            None => Position::Exhausted,
        }
    }

    pub fn current_idea(&self) -> Option<&Idea> {
        self.sequence.get(self.index)
    }

    /// True when the pointer is near the end, more pages exist and no fetch is running.
    pub fn needs_more(&self) -> bool {
        self.has_more
            && !self.is_loading_more
            && self.index + PREFETCH_DISTANCE >= self.sequence.len()
    }

    /// Claim the next page fetch. Returns the offset to request, or `None` when
    /// no fetch is due or one is already in flight.
    pub fn begin_fetch(&mut self) -> Option<usize> {
        if !self.needs_more() {
            return None;
        }
        self.is_loading_more = true;
        Some(self.sequence.len())
    }

    /// Shuffle the page on its own and append it.
    pub fn complete_fetch<R: Rng + ?Sized>(&mut self, mut page: IdeaPage, rng: &mut R) {
        if self.owner_id.is_none() {
            self.owner_id = page.creator_id().map(str::to_string);
        }
        if self.group_title.is_empty() {
            self.group_title = std::mem::take(&mut page.group_title);
        }

        let received = page.ideas.len();
        page.ideas.shuffle(rng);
        self.sequence.extend(page.ideas);

        // An empty page means the group shrank under us; stop asking.
        self.has_more = page.pagination.has_more && received > 0;
        self.is_loading_more = false;
    }

    /// Release the fetch claim after a failed request so a later trigger can retry.
    pub fn fail_fetch(&mut self) {
        self.is_loading_more = false;
    }

    pub fn advance(&mut self) {
        if self.index < self.sequence.len() {
            self.index += 1;
        }
    }

    pub fn retreat(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// Replace the counters of every loaded copy of `updated`.
    pub fn merge(&mut self, updated: &Idea) {
        for idea in self
            .sequence
            .iter_mut()
            .filter(|i| i.shareable_id == updated.shareable_id)
        {
            idea.votes = updated.votes;
            idea.views = updated.views;
        }
    }

    pub fn set_views(&mut self, shareable_id: &str, views: i64) {
        for idea in self
            .sequence
            .iter_mut()
            .filter(|i| i.shareable_id == shareable_id)
        {
            idea.views = views;
        }
    }
}
