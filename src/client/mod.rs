//! Voting client: the pieces a visitor's device runs while swiping through a group.

pub mod api;
pub mod cursor;
pub mod identity;
pub mod retry;
pub mod session;
pub mod undo;

pub use api::{ApiError, HttpIdeaApi, IdeaApi};
pub use cursor::{FeedCursor, Position};
pub use identity::CreatorIdentity;
pub use retry::{PendingVote, ResponseCache, RetryQueue};
pub use session::{ClientConfig, FeedSnapshot, SubmitOutcome, UndoOutcome, VotingSession};
pub use undo::{UndoController, VoteConfirmation};
