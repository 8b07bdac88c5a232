//! End-to-end tests: a real `HttpServer` on an ephemeral port, driven by
//! `HttpIdeaApi` over reqwest.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, dev::ServerHandle};
use rand::SeedableRng;
use rand::rngs::StdRng;

use ideaswipe::client::{
    ApiError, ClientConfig, HttpIdeaApi, IdeaApi, SubmitOutcome, UndoOutcome, VotingSession,
};
use ideaswipe::config::Config;
use ideaswipe::handlers;
use ideaswipe::models::idea::{IdeaInput, IdeaStore, MemoryIdeaStore, VoteType};
use common::{INTRUDER, OWNER, numbered_ideas};

struct TestServer {
    addr: SocketAddr,
    handle: ServerHandle,
}

impl TestServer {
    fn start(store: Arc<dyn IdeaStore>) -> Self {
        let server = HttpServer::new(move || {
            App::new().configure(handlers::configure(store.clone(), Config::default()))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind ephemeral port");
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_rt::spawn(server);
        Self { addr, handle }
    }

    fn api(&self) -> HttpIdeaApi {
        HttpIdeaApi::new(format!("http://{}", self.addr), Duration::from_secs(5)).unwrap()
    }

    async fn stop(self) {
        self.handle.stop(true).await;
    }
}

#[actix_rt::test]
async fn test_group_lifecycle_over_http() {
    let server = TestServer::start(Arc::new(MemoryIdeaStore::new()));
    let api = server.api();

    let created = api.create_group(OWNER, numbered_ideas(3)).await.unwrap();
    assert_eq!(created.count, 3);
    assert_eq!(created.group_title, "Idea 0");

    let page = api.list_page(&created.group_id, 0, 2).await.unwrap();
    assert_eq!(page.ideas.len(), 2);
    assert!(page.pagination.has_more);
    assert_eq!(page.creator_id(), Some(OWNER));

    let err = api
        .replace_group(&created.group_id, INTRUDER, numbered_ideas(1))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(matches!(err, ApiError::Server { code: Some(ref c), .. } if c == "FORBIDDEN"));

    let replaced = api
        .replace_group(
            &created.group_id,
            OWNER,
            vec![IdeaInput {
                title: "Only one".to_string(),
                description: "left".to_string(),
            }],
        )
        .await
        .unwrap();
    assert_eq!(replaced.group_title, "Only one");
    assert_eq!(replaced.ideas.len(), 1);

    let groups = api.creator_groups(OWNER).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].ideas.len(), 1);

    api.delete_group(&created.group_id, OWNER).await.unwrap();
    let err = api.list_page(&created.group_id, 0, 2).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(!err.is_transient());

    server.stop().await;
}

#[actix_rt::test]
async fn test_vote_undo_view_over_http() {
    let store = Arc::new(MemoryIdeaStore::new());
    let created = store.create_group(OWNER, &numbered_ideas(1)).await.unwrap();
    let server = TestServer::start(store.clone());
    let api = server.api();

    let id = api.list_page(&created.group_id, 0, 1).await.unwrap().ideas[0]
        .shareable_id
        .clone();

    let idea = api.submit_vote(&id, VoteType::SuperLike).await.unwrap();
    assert_eq!(idea.votes.super_like, 1);
    let idea = api.undo_vote(&id, VoteType::SuperLike).await.unwrap();
    assert_eq!(idea.votes.super_like, 0);

    assert_eq!(api.record_view(&id).await.unwrap(), 1);
    assert_eq!(api.get_idea(&id).await.unwrap().views, 1);

    let err = api.submit_vote("unknown", VoteType::Up).await.unwrap_err();
    assert_eq!(err.status(), Some(404));

    server.stop().await;
}

#[actix_rt::test]
async fn test_session_against_live_server() {
    let store = Arc::new(MemoryIdeaStore::new());
    let created = store.create_group(OWNER, &numbered_ideas(4)).await.unwrap();
    let server = TestServer::start(store.clone());

    let config = ClientConfig {
        base_url: format!("http://{}", server.addr),
        batch_size: 2,
        display_delay: Duration::from_millis(10),
        ..ClientConfig::default()
    };
    let api = HttpIdeaApi::from_config(&config).unwrap();
    let session = VotingSession::with_rng(
        created.group_id.clone(),
        Arc::new(api) as Arc<dyn IdeaApi>,
        config,
        StdRng::seed_from_u64(5),
    );

    session.start().await.unwrap();
    // A batch of two already sits inside the prefetch window.
    assert_eq!(session.snapshot().loaded, 4);

    let first = session.current().unwrap();
    assert!(matches!(session.submit(VoteType::Up).await, SubmitOutcome::Recorded(_)));
    assert!(matches!(session.undo().await, UndoOutcome::Undone(_)));
    assert_eq!(session.current().unwrap().shareable_id, first.shareable_id);

    for _ in 0..4 {
        session.submit(VoteType::Neutral).await;
    }
    assert!(session.snapshot().exhausted);

    let neutral: i64 = common::all_ideas(store.as_ref(), &created.group_id)
        .await
        .iter()
        .map(|i| i.votes.neutral)
        .sum();
    assert_eq!(neutral, 4);

    server.stop().await;
}
