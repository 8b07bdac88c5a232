pub mod creator;
pub mod group;
pub mod vote;

use std::sync::Arc;

use actix_web::web;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::idea::IdeaStore;
use crate::models::idea::validate::{
    MAX_CREATOR_ID_LEN, MAX_DESCRIPTION_LEN, MAX_IDEAS_PER_GROUP, MAX_TITLE_LEN,
};

/// Largest valid submission, every character JSON-escaped as a surrogate pair
/// (12 bytes), plus room for keys and punctuation.
pub const MAX_BODY_BYTES: usize =
    (MAX_IDEAS_PER_GROUP * (MAX_TITLE_LEN + MAX_DESCRIPTION_LEN) + MAX_CREATOR_ID_LEN) * 12
        + 64 * 1024;

/// Body parse failures (bad JSON, unknown vote type, wrong content type)
/// answer with the same error envelope as every other 4xx.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_BODY_BYTES)
        .error_handler(|err, _req| AppError::validation(format!("Invalid request body: {err}")).into())
}

/// Register shared state and the `/ideas` routes.
///
/// `/ideas/group/...` and `/ideas/creator/...` are registered BEFORE
/// `/ideas/{shareable_id}/...` so the literal segments win.
pub fn configure(
    store: Arc<dyn IdeaStore>,
    config: Config,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::from(store))
            .app_data(web::Data::new(config))
            .app_data(json_config());

        cfg.service(
            web::scope("/ideas")
                .route("", web::post().to(group::create))
                .route("/group/{group_id}", web::get().to(group::list))
                .route("/group/{group_id}", web::put().to(group::replace))
                .route("/group/{group_id}", web::delete().to(group::delete))
                .route("/creator/{creator_id}", web::get().to(creator::list_groups))
                .route("/{shareable_id}", web::get().to(vote::read))
                .route("/{shareable_id}/vote", web::post().to(vote::vote))
                .route("/{shareable_id}/vote/undo", web::post().to(vote::undo))
                .route("/{shareable_id}/view", web::post().to(vote::view)),
        );
    }
}
