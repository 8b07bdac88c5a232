use actix_web::{HttpResponse, web};

use crate::errors::AppError;
use crate::models::idea::{IdeaStore, VoteRequest, ViewCount};

/// GET /ideas/{shareable_id} - Single idea with its current counters.
pub async fn read(
    store: web::Data<dyn IdeaStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let shareable_id = path.into_inner();

    let idea = store
        .find_idea(&shareable_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Idea '{shareable_id}' not found")))?;

    Ok(HttpResponse::Ok().json(idea))
}

/// POST /ideas/{shareable_id}/vote - Add one vote of the given type.
pub async fn vote(
    store: web::Data<dyn IdeaStore>,
    path: web::Path<String>,
    body: web::Json<VoteRequest>,
) -> Result<HttpResponse, AppError> {
    let shareable_id = path.into_inner();

    let idea = store.submit_vote(&shareable_id, body.vote).await?;
    log::debug!("Vote {} on {}", body.vote, shareable_id);

    Ok(HttpResponse::Ok().json(idea))
}

/// POST /ideas/{shareable_id}/vote/undo - Remove one vote of the given type.
///
/// The caller names the type; there is no per-voter record to infer it from.
pub async fn undo(
    store: web::Data<dyn IdeaStore>,
    path: web::Path<String>,
    body: web::Json<VoteRequest>,
) -> Result<HttpResponse, AppError> {
    let shareable_id = path.into_inner();

    let idea = store.undo_vote(&shareable_id, body.vote).await?;
    log::debug!("Undo {} on {}", body.vote, shareable_id);

    Ok(HttpResponse::Ok().json(idea))
}

/// POST /ideas/{shareable_id}/view - Count one view.
pub async fn view(
    store: web::Data<dyn IdeaStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let views = store.increment_view(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ViewCount { views }))
}
