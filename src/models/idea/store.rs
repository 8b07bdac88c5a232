use async_trait::async_trait;
use rand::{Rng, distr::Alphanumeric};

use crate::errors::AppError;
use super::types::*;

/// Length of generated `shareableId` and `groupId` tokens.
pub const TOKEN_LEN: usize = 10;

/// Persistence boundary for ideas, their groups and their counters.
///
/// Counter mutations must be single atomic operations in the backing store:
/// handlers run concurrently for independent anonymous clients and there is
/// no application-level lock spanning requests.
#[async_trait]
pub trait IdeaStore: Send + Sync {
    /// Create a new group owned by `creator_id`. `ideas` is stored in the given order.
    async fn create_group(
        &self,
        creator_id: &str,
        ideas: &[IdeaInput],
    ) -> Result<GroupCreated, AppError>;

    /// Slice of a group ordered by `order` ascending.
    ///
    /// An unknown group is `NotFound`; an offset at or past the end is an empty page.
    async fn list_page(&self, group_id: &str, offset: i64, limit: i64)
    -> Result<IdeaPage, AppError>;

    /// Delete every idea of the group and recreate it from `ideas`. Owner only.
    async fn replace_group(
        &self,
        group_id: &str,
        creator_id: &str,
        ideas: &[IdeaInput],
    ) -> Result<GroupReplaced, AppError>;

    /// Delete every idea of the group. Owner only. Returns the number of ideas removed.
    async fn delete_group(&self, group_id: &str, creator_id: &str) -> Result<u64, AppError>;

    async fn find_idea(&self, shareable_id: &str) -> Result<Option<Idea>, AppError>;

    /// Atomically add one vote of `vote` and return the updated record.
    async fn submit_vote(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, AppError>;

    /// Atomically remove one vote of `vote`. A counter already at zero stays at zero.
    async fn undo_vote(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, AppError>;

    /// Unconditionally count one more view. Returns the new view count.
    async fn increment_view(&self, shareable_id: &str) -> Result<i64, AppError>;

    /// All groups owned by `creator_id`, newest first.
    async fn groups_for_creator(&self, creator_id: &str) -> Result<Vec<GroupSummary>, AppError>;
}

/// Random alphanumeric token used for public identifiers.
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub(crate) fn idea_not_found(shareable_id: &str) -> AppError {
    AppError::NotFound(format!("Idea '{shareable_id}' not found"))
}

pub(crate) fn group_not_found(group_id: &str) -> AppError {
    AppError::NotFound(format!("No ideas found in group '{group_id}'"))
}

pub(crate) fn check_owner(group_id: &str, owner: &str, creator_id: &str) -> Result<(), AppError> {
    if owner == creator_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Not authorized to modify group '{group_id}'"
        )))
    }
}

pub(crate) fn check_page_bounds(offset: i64, limit: i64) -> Result<(), AppError> {
    let mut errors = Vec::new();
    if offset < 0 {
        errors.push("offset must not be negative".to_string());
    }
    if limit < 1 {
        errors.push("limit must be at least 1".to_string());
    }
    if errors.is_empty() { Ok(()) } else { Err(AppError::Validation(errors)) }
}

/// Group title: the title of the first idea in authoring order.
pub fn group_title(ideas: &[IdeaInput]) -> String {
    ideas.first().map(|i| i.title.clone()).unwrap_or_default()
}

/// Fold a creator's ideas into per-group summaries, newest group first.
pub(crate) fn summarize_groups(mut ideas: Vec<Idea>) -> Vec<GroupSummary> {
    ideas.sort_by(|a, b| {
        a.group_id
            .cmp(&b.group_id)
            .then(a.order.cmp(&b.order))
            .then(a.id.cmp(&b.id))
    });

    let mut groups: Vec<GroupSummary> = Vec::new();
    for idea in ideas {
        match groups.last_mut() {
            Some(g) if g.group_id == idea.group_id => {
                g.total_views += idea.views;
                g.created_at = g.created_at.min(idea.created_at);
                g.ideas.push(idea);
            }
            _ => groups.push(GroupSummary {
                group_id: idea.group_id.clone(),
                group_title: idea.title.clone(),
                total_views: idea.views,
                created_at: idea.created_at,
                ideas: vec![idea],
            }),
        }
    }

    groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    groups
}
