use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::errors::AppError;
use super::store::{
    IdeaStore, check_owner, check_page_bounds, generate_token, group_not_found, idea_not_found,
    summarize_groups,
};
use super::types::*;

#[derive(Default)]
struct MemoryState {
    ideas: HashMap<String, Idea>,
    /// Every group id and shareable id ever issued; a deleted id is never handed out again.
    issued: HashSet<String>,
    next_id: i64,
}

impl MemoryState {
    fn fresh_token(&mut self) -> String {
        loop {
            let token = generate_token();
            if self.issued.insert(token.clone()) {
                return token;
            }
        }
    }

    fn group(&self, group_id: &str) -> Vec<&Idea> {
        let mut ideas: Vec<&Idea> = self
            .ideas
            .values()
            .filter(|i| i.group_id == group_id)
            .collect();
        ideas.sort_by(|a, b| a.order.cmp(&b.order).then(a.id.cmp(&b.id)));
        ideas
    }

    fn owner(&self, group_id: &str) -> Option<&str> {
        self.ideas
            .values()
            .find(|i| i.group_id == group_id)
            .map(|i| i.creator_id.as_str())
    }

    fn insert_group(&mut self, group_id: &str, creator_id: &str, inputs: &[IdeaInput]) -> Vec<Idea> {
        let now = Utc::now();
        let mut created = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            self.next_id += 1;
            let idea = Idea {
                id: self.next_id,
                shareable_id: self.fresh_token(),
                group_id: group_id.to_string(),
                creator_id: creator_id.to_string(),
                order: index as i32,
                title: input.title.clone(),
                description: input.description.clone(),
                votes: VoteCounts::default(),
                views: 0,
                created_at: now,
            };
            self.ideas.insert(idea.shareable_id.clone(), idea.clone());
            created.push(idea);
        }
        created
    }

    fn remove_group(&mut self, group_id: &str) -> u64 {
        let before = self.ideas.len();
        self.ideas.retain(|_, i| i.group_id != group_id);
        (before - self.ideas.len()) as u64
    }
}

/// In-process `IdeaStore`. Every operation runs under one lock, which makes
/// each counter mutation atomic. Used when no database is configured and by tests.
#[derive(Clone, Default)]
pub struct MemoryIdeaStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryIdeaStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl IdeaStore for MemoryIdeaStore {
    async fn create_group(
        &self,
        creator_id: &str,
        ideas: &[IdeaInput],
    ) -> Result<GroupCreated, AppError> {
        let mut state = self.lock();
        let group_id = state.fresh_token();
        let created = state.insert_group(&group_id, creator_id, ideas);
        log::info!("Created group {} with {} ideas", group_id, created.len());

        Ok(GroupCreated {
            group_title: created.first().map(|i| i.title.clone()).unwrap_or_default(),
            group_id,
            count: created.len(),
        })
    }

    async fn list_page(
        &self,
        group_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<IdeaPage, AppError> {
        check_page_bounds(offset, limit)?;

        let state = self.lock();
        let group = state.group(group_id);
        if group.is_empty() {
            return Err(group_not_found(group_id));
        }

        let total = group.len() as i64;
        let group_title = group[0].title.clone();
        let ideas: Vec<Idea> = group
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(IdeaPage {
            pagination: Pagination::new(offset, limit, total, ideas.len()),
            ideas,
            group_title,
        })
    }

    async fn replace_group(
        &self,
        group_id: &str,
        creator_id: &str,
        ideas: &[IdeaInput],
    ) -> Result<GroupReplaced, AppError> {
        let mut state = self.lock();
        let owner = state.owner(group_id).ok_or_else(|| group_not_found(group_id))?;
        check_owner(group_id, owner, creator_id)?;

        state.remove_group(group_id);
        let created = state.insert_group(group_id, creator_id, ideas);
        log::info!("Replaced group {} with {} ideas", group_id, created.len());

        Ok(GroupReplaced {
            group_id: group_id.to_string(),
            group_title: created.first().map(|i| i.title.clone()).unwrap_or_default(),
            ideas: created,
        })
    }

    async fn delete_group(&self, group_id: &str, creator_id: &str) -> Result<u64, AppError> {
        let mut state = self.lock();
        let owner = state.owner(group_id).ok_or_else(|| group_not_found(group_id))?;
        check_owner(group_id, owner, creator_id)?;

        let removed = state.remove_group(group_id);
        log::info!("Deleted group {} ({} ideas)", group_id, removed);
        Ok(removed)
    }

    async fn find_idea(&self, shareable_id: &str) -> Result<Option<Idea>, AppError> {
        Ok(self.lock().ideas.get(shareable_id).cloned())
    }

    async fn submit_vote(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, AppError> {
        let mut state = self.lock();
        let idea = state
            .ideas
            .get_mut(shareable_id)
            .ok_or_else(|| idea_not_found(shareable_id))?;
        idea.votes.increment(vote);
        Ok(idea.clone())
    }

    async fn undo_vote(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, AppError> {
        let mut state = self.lock();
        let idea = state
            .ideas
            .get_mut(shareable_id)
            .ok_or_else(|| idea_not_found(shareable_id))?;
        if !idea.votes.decrement(vote) {
            log::debug!("Undo {} on {} ignored: counter already zero", vote, shareable_id);
        }
        Ok(idea.clone())
    }

    async fn increment_view(&self, shareable_id: &str) -> Result<i64, AppError> {
        let mut state = self.lock();
        let idea = state
            .ideas
            .get_mut(shareable_id)
            .ok_or_else(|| idea_not_found(shareable_id))?;
        idea.views += 1;
        Ok(idea.views)
    }

    async fn groups_for_creator(&self, creator_id: &str) -> Result<Vec<GroupSummary>, AppError> {
        let ideas = self
            .lock()
            .ideas
            .values()
            .filter(|i| i.creator_id == creator_id)
            .cloned()
            .collect();
        Ok(summarize_groups(ideas))
    }
}
