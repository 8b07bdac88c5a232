use actix_web::{HttpResponse, web};

use crate::errors::AppError;
use crate::models::idea::IdeaStore;
use crate::models::idea::validate::validate_creator_id;

/// GET /ideas/creator/{creator_id} - Every group owned by the creator, newest first.
pub async fn list_groups(
    store: web::Data<dyn IdeaStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let creator_id = path.into_inner();
    if let Some(e) = validate_creator_id(&creator_id) {
        return Err(AppError::validation(e));
    }

    let groups = store.groups_for_creator(creator_id.trim()).await?;

    Ok(HttpResponse::Ok().json(groups))
}
