//! Vote store tests: atomic counter mutations against the in-memory store.
//!
//! Covers: submit_vote, undo_vote, increment_view, not-found paths and
//! concurrent increments from independent clients.

mod common;

use std::sync::Arc;

use ideaswipe::errors::AppError;
use ideaswipe::models::idea::{IdeaStore, MemoryIdeaStore, VoteCounts, VoteType};
use common::{all_ideas, seed_group};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_are_not_lost() {
    let (store, group_id) = seed_group(1).await;
    let id = all_ideas(&store, &group_id).await[0].shareable_id.clone();
    let store: Arc<dyn IdeaStore> = Arc::new(store);

    const N: usize = 200;
    let handles: Vec<_> = (0..N)
        .map(|_| {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move { store.submit_vote(&id, VoteType::Up).await })
        })
        .collect();

    for handle in handles {
        handle.await.expect("join").expect("vote");
    }

    let idea = store.find_idea(&id).await.unwrap().unwrap();
    assert_eq!(idea.votes.up, N as i64);
    assert_eq!(idea.votes.super_like, 0);
    assert_eq!(idea.votes.neutral, 0);
}

#[tokio::test]
async fn test_vote_then_undo_restores_counters() {
    let (store, group_id) = seed_group(1).await;
    let id = all_ideas(&store, &group_id).await[0].shareable_id.clone();

    for vote in VoteType::ALL {
        let before = store.find_idea(&id).await.unwrap().unwrap().votes;
        let voted = store.submit_vote(&id, vote).await.unwrap();
        assert_eq!(voted.votes.get(vote), before.get(vote) + 1);

        let undone = store.undo_vote(&id, vote).await.unwrap();
        assert_eq!(undone.votes, before);
    }
}

#[tokio::test]
async fn test_scenario_up_vote_and_undo() {
    let (store, group_id) = seed_group(1).await;
    let id = all_ideas(&store, &group_id).await[0].shareable_id.clone();

    let voted = store.submit_vote(&id, VoteType::Up).await.unwrap();
    assert_eq!(voted.votes, VoteCounts { super_like: 0, up: 1, neutral: 0 });

    let undone = store.undo_vote(&id, VoteType::Up).await.unwrap();
    assert_eq!(undone.votes, VoteCounts::default());
}

#[tokio::test]
async fn test_undo_without_vote_never_goes_negative() {
    let (store, group_id) = seed_group(1).await;
    let id = all_ideas(&store, &group_id).await[0].shareable_id.clone();

    let idea = store.undo_vote(&id, VoteType::Neutral).await.unwrap();
    assert_eq!(idea.votes.neutral, 0);

    // The other counters are untouched by a floored undo.
    store.submit_vote(&id, VoteType::SuperLike).await.unwrap();
    let idea = store.undo_vote(&id, VoteType::Up).await.unwrap();
    assert_eq!(idea.votes, VoteCounts { super_like: 1, up: 0, neutral: 0 });
}

#[tokio::test]
async fn test_unknown_idea_is_not_found() {
    let store = MemoryIdeaStore::new();

    assert!(matches!(
        store.submit_vote("missing", VoteType::Up).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        store.undo_vote("missing", VoteType::Up).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        store.increment_view("missing").await,
        Err(AppError::NotFound(_))
    ));
    assert!(store.find_idea("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_every_view_counts() {
    let (store, group_id) = seed_group(2).await;
    let ideas = all_ideas(&store, &group_id).await;

    assert_eq!(store.increment_view(&ideas[0].shareable_id).await.unwrap(), 1);
    assert_eq!(store.increment_view(&ideas[0].shareable_id).await.unwrap(), 2);
    assert_eq!(store.increment_view(&ideas[0].shareable_id).await.unwrap(), 3);

    let other = store.find_idea(&ideas[1].shareable_id).await.unwrap().unwrap();
    assert_eq!(other.views, 0);
}

#[tokio::test]
async fn test_vote_type_parses_wire_names() {
    assert_eq!("superLike".parse::<VoteType>(), Ok(VoteType::SuperLike));
    assert_eq!("up".parse::<VoteType>(), Ok(VoteType::Up));
    assert_eq!("neutral".parse::<VoteType>(), Ok(VoteType::Neutral));
    assert!("down".parse::<VoteType>().is_err());
    assert_eq!(serde_json::to_string(&VoteType::SuperLike).unwrap(), "\"superLike\"");
}
