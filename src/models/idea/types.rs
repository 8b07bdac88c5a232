use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three mutually exclusive vote categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoteType {
    SuperLike,
    Up,
    Neutral,
}

impl VoteType {
    pub const ALL: [VoteType; 3] = [VoteType::SuperLike, VoteType::Up, VoteType::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::SuperLike => "superLike",
            VoteType::Up => "up",
            VoteType::Neutral => "neutral",
        }
    }

    /// Counter column backing this vote type.
    pub(crate) fn column(&self) -> &'static str {
        match self {
            VoteType::SuperLike => "votes_super_like",
            VoteType::Up => "votes_up",
            VoteType::Neutral => "votes_neutral",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VoteType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown vote type '{s}' (expected superLike, up or neutral)"))
    }
}

/// Aggregate vote counters for one idea.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCounts {
    pub super_like: i64,
    pub up: i64,
    pub neutral: i64,
}

impl VoteCounts {
    pub fn get(&self, vote: VoteType) -> i64 {
        match vote {
            VoteType::SuperLike => self.super_like,
            VoteType::Up => self.up,
            VoteType::Neutral => self.neutral,
        }
    }

    fn slot(&mut self, vote: VoteType) -> &mut i64 {
        match vote {
            VoteType::SuperLike => &mut self.super_like,
            VoteType::Up => &mut self.up,
            VoteType::Neutral => &mut self.neutral,
        }
    }

    pub fn increment(&mut self, vote: VoteType) {
        *self.slot(vote) += 1;
    }

    /// Decrement, floored at zero. Returns false when the counter was already zero.
    pub fn decrement(&mut self, vote: VoteType) -> bool {
        let slot = self.slot(vote);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    pub fn total(&self) -> i64 {
        self.super_like + self.up + self.neutral
    }
}

/// A single idea as stored and as served over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: i64,
    pub shareable_id: String,
    pub group_id: String,
    pub creator_id: String,
    pub order: i32,
    pub title: String,
    pub description: String,
    pub votes: VoteCounts,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

impl Idea {
    /// Copy of this idea with one more vote of the given type.
    pub fn with_vote(&self, vote: VoteType) -> Idea {
        let mut next = self.clone();
        next.votes.increment(vote);
        next
    }
}

/// Title/description pair submitted when creating or replacing a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Body of `POST /ideas` and `PUT /ideas/group/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSubmission {
    #[serde(default)]
    pub ideas: Vec<IdeaInput>,
    #[serde(default)]
    pub creator_id: String,
}

/// Body of `DELETE /ideas/group/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRequest {
    #[serde(default)]
    pub creator_id: String,
}

/// Body of the vote and undo endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoteRequest {
    #[serde(rename = "type")]
    pub vote: VoteType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCreated {
    pub group_id: String,
    pub group_title: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReplaced {
    pub group_id: String,
    pub group_title: String,
    pub ideas: Vec<Idea>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
    pub total: i64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(offset: i64, limit: i64, total: i64, returned: usize) -> Self {
        Pagination {
            offset,
            limit,
            total,
            has_more: offset + (returned as i64) < total,
        }
    }
}

/// One page of a group, ordered by `order` ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaPage {
    pub ideas: Vec<Idea>,
    pub pagination: Pagination,
    pub group_title: String,
}

impl IdeaPage {
    /// Owner token of the group, taken from any idea on the page.
    pub fn creator_id(&self) -> Option<&str> {
        self.ideas.first().map(|i| i.creator_id.as_str())
    }
}

/// A creator's group as listed on the "my lists" view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub group_id: String,
    pub group_title: String,
    pub ideas: Vec<Idea>,
    pub total_views: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewCount {
    pub views: i64,
}
