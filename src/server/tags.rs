use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CreateTagRequest, TagWithProducts, UpdateTagRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_tag_name;
use crate::store::TagPatch;

fn tag_not_found(id: i64) -> ApiError {
    ApiError::not_found("Tag not found", format!("Tag with ID {id} does not exist"))
}

pub async fn list_tags(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store.as_ref();

    let tags = store.list_tags().api_err("Failed to fetch tags")?;

    Ok::<_, ApiError>(Json(ApiResponse::list(tags)))
}

pub async fn get_tag(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> impl IntoResponse {
    let store = state.store.as_ref();

    let tag = store
        .get_tag(id)
        .api_err("Failed to fetch tag")?
        .ok_or_else(|| tag_not_found(id))?;

    let products = store
        .list_tag_products(tag.id)
        .api_err("Failed to fetch tag")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(TagWithProducts { tag, products })))
}

pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTagRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let Some(name) = req.name else {
        return Err(ApiError::validation("Name is required"));
    };
    let name = name.trim().to_string();
    validate_tag_name(&name)?;
    let description = req.description.map(|d| d.trim().to_string());

    let tag = match store.create_tag(&name, description.as_deref()) {
        Ok(tag) => tag,
        Err(Error::Conflict(message)) => {
            return Err(ApiError::conflict("Tag already exists", message));
        }
        Err(e) => {
            tracing::error!("Failed to create tag: {e}");
            return Err(ApiError::internal("Failed to create tag"));
        }
    };

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Tag created successfully", tag)),
    ))
}

pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTagRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let patch = TagPatch {
        name: req.name.map(|n| n.trim().to_string()),
        description: req.description.map(|d| d.trim().to_string()),
    };

    match store.update_tag(id, &patch) {
        Ok(()) => {}
        Err(Error::NotFound) => return Err(tag_not_found(id)),
        Err(Error::Conflict(message)) => {
            return Err(ApiError::conflict("Tag name already exists", message));
        }
        Err(e) => {
            tracing::error!("Failed to update tag: {e}");
            return Err(ApiError::internal("Failed to update tag"));
        }
    }

    let tag = store
        .get_tag(id)
        .api_err("Failed to fetch tag")?
        .ok_or_else(|| ApiError::internal("Failed to fetch tag"))?;

    Ok::<_, ApiError>(Json(ApiResponse::with_message(
        "Tag updated successfully",
        tag,
    )))
}

pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let deleted = store.delete_tag(id).api_err("Failed to delete tag")?;
    if !deleted {
        return Err(tag_not_found(id));
    }

    Ok::<_, ApiError>(Json(ApiResponse::<()>::message("Tag deleted successfully")))
}
