use std::collections::HashMap;

use actix_web::{HttpResponse, web};

use crate::config::Config;
use crate::errors::AppError;
use crate::models::idea::validate::{normalize, validate_creator_id, validate_submission};
use crate::models::idea::{GroupSubmission, IdeaStore, OwnerRequest};

/// Read an optional non-negative integer query parameter.
fn parse_param(
    query: &HashMap<String, String>,
    key: &str,
    default: i64,
) -> Result<i64, String> {
    match query.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(default),
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if n >= 0 => Ok(n),
            _ => Err(format!("{key} must be a non-negative integer")),
        },
    }
}

/// POST /ideas - Create a group from a list of ideas.
pub async fn create(
    store: web::Data<dyn IdeaStore>,
    body: web::Json<GroupSubmission>,
) -> Result<HttpResponse, AppError> {
    let errors = validate_submission(&body);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let ideas = normalize(&body.ideas);
    let created = store.create_group(body.creator_id.trim(), &ideas).await?;

    Ok(HttpResponse::Ok().json(created))
}

/// GET /ideas/group/{group_id} - One page of a group, in authoring order.
/// Query params: offset (default 0), limit (default from config, capped).
pub async fn list(
    store: web::Data<dyn IdeaStore>,
    config: web::Data<Config>,
    path: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();

    let mut errors = Vec::new();
    let offset = parse_param(&query, "offset", 0).unwrap_or_else(|e| {
        errors.push(e);
        0
    });
    let limit = parse_param(&query, "limit", config.page_limit_default).unwrap_or_else(|e| {
        errors.push(e);
        0
    });
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    let limit = limit.clamp(1, config.page_limit_max);

    let page = store.list_page(&group_id, offset, limit).await?;

    Ok(HttpResponse::Ok().json(page))
}

/// PUT /ideas/group/{group_id} - Replace the whole group. Owner only.
pub async fn replace(
    store: web::Data<dyn IdeaStore>,
    path: web::Path<String>,
    body: web::Json<GroupSubmission>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();

    let errors = validate_submission(&body);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let ideas = normalize(&body.ideas);
    let replaced = store
        .replace_group(&group_id, body.creator_id.trim(), &ideas)
        .await?;

    Ok(HttpResponse::Ok().json(replaced))
}

/// DELETE /ideas/group/{group_id} - Remove every idea in the group. Owner only.
pub async fn delete(
    store: web::Data<dyn IdeaStore>,
    path: web::Path<String>,
    body: web::Json<OwnerRequest>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();

    if let Some(e) = validate_creator_id(&body.creator_id) {
        return Err(AppError::validation(e));
    }

    let deleted = store.delete_group(&group_id, body.creator_id.trim()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Group deleted successfully",
        "deleted": deleted,
    })))
}
