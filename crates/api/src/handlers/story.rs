//! Handlers for stories: metadata, content, collaborators, and forks.
//!
//! Reads are public. Writes take an [`AuthUser`] and check it against the
//! story's owner and collaborators with the policy in
//! [`storyhub_core::access`] before touching storage.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use storyhub_core::access;
use storyhub_core::error::CoreError;
use storyhub_core::pagination::{PageParams, PageRequest};
use storyhub_core::types::ObjectId;
use storyhub_db::models::story::{AddCollaborator, CreateStory, EditContent};
use validator::Validate;

use crate::engine::fork::fork_story;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::StoryListParams;
use crate::response::{CreatedId, DataResponse};
use crate::state::AppState;

/// Parse a path segment as an object id, rejecting with a JSON 400.
fn parse_id(raw: &str) -> AppResult<ObjectId> {
    raw.parse()
        .map_err(|e| AppError::BadRequest(format!("Invalid id '{raw}': {e}")))
}

// ---------------------------------------------------------------------------
// Story metadata
// ---------------------------------------------------------------------------

/// POST /api/v1/stories
///
/// Create a story owned by the caller. No content exists until the first
/// edit.
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    input: Result<Json<CreateStory>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = input?;
    input.validate()?;
    access::validate_collaborators(&auth.user_id, &input.collaborators)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let id = state
        .stories
        .create(&input.into_new_story(auth.user_id))
        .await?;

    tracing::info!(story_id = %id, owner_id = %auth.user_id, "Story created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: CreatedId { id } })))
}

/// GET /api/v1/stories?page=&limit=&genres=a,b
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<StoryListParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let page = params.page_request();
    let genres = params.genre_list();

    let stories = if genres.is_empty() {
        state.stories.list(page).await?
    } else {
        state.stories.list_by_genres(&genres, page).await?
    };

    Ok(Json(DataResponse { data: stories }))
}

/// GET /api/v1/stories/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let details = state.stories.get_details(parse_id(&id)?).await?;
    Ok(Json(DataResponse { data: details }))
}

/// DELETE /api/v1/stories/{id}
///
/// Owner only. Removes metadata and content.
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let details = state.stories.get_details(id).await?;

    if !access::can_delete(Some(&auth.user_id), &details.owner_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the owner can delete this story".into(),
        )));
    }

    state.stories.delete(id).await?;

    tracing::info!(story_id = %id, owner_id = %auth.user_id, "Story deleted");

    Ok(Json(DataResponse {
        data: serde_json::json!({ "deleted": true }),
    }))
}

// ---------------------------------------------------------------------------
// Story content
// ---------------------------------------------------------------------------

/// GET /api/v1/stories/{id}/content
///
/// A story that was never edited has an empty body.
pub async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let content = state.stories.get_content(parse_id(&id)?).await?;
    Ok(Json(DataResponse { data: content }))
}

/// PUT /api/v1/stories/{id}/content
///
/// Owner or collaborator.
pub async fn edit_content(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    input: Result<Json<EditContent>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = input?;
    let id = parse_id(&id)?;
    let details = state.stories.get_details(id).await?;

    if !access::can_mutate(Some(&auth.user_id), &details.owner_id, &details.collaborators) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the owner or a collaborator can edit this story".into(),
        )));
    }

    state.stories.edit_content(id, &input.content).await?;

    tracing::info!(
        story_id = %id,
        user_id = %auth.user_id,
        content_len = input.content.len(),
        "Story content updated",
    );

    Ok(Json(DataResponse {
        data: serde_json::json!({ "updated": true }),
    }))
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// GET /api/v1/stories/{id}/collaborators
pub async fn get_collaborators(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let collaborators = state.stories.get_collaborators(parse_id(&id)?).await?;
    Ok(Json(DataResponse { data: collaborators }))
}

/// POST /api/v1/stories/{id}/collaborators
///
/// Owner only. The owner cannot add themselves.
pub async fn add_collaborator(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    input: Result<Json<AddCollaborator>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = input?;
    let id = parse_id(&id)?;
    let details = state.stories.get_details(id).await?;

    if !access::can_manage_collaborators(Some(&auth.user_id), &details.owner_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the owner can manage collaborators".into(),
        )));
    }
    access::validate_collaborators(&details.owner_id, &[input.user_id])
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let updated = state.stories.add_collaborator(id, input.user_id).await?;

    tracing::info!(story_id = %id, collaborator_id = %input.user_id, "Collaborator added");

    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/stories/{id}/collaborators/{user_id}
///
/// Owner only. Returns 404 when the user was not a collaborator.
pub async fn remove_collaborator(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let user_id = parse_id(&user_id)?;
    let details = state.stories.get_details(id).await?;

    if !access::can_manage_collaborators(Some(&auth.user_id), &details.owner_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the owner can manage collaborators".into(),
        )));
    }

    if !state.stories.remove_collaborator(id, user_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Collaborator",
            id: user_id.to_hex(),
        }));
    }

    tracing::info!(story_id = %id, collaborator_id = %user_id, "Collaborator removed");

    Ok(Json(DataResponse {
        data: serde_json::json!({ "removed": true }),
    }))
}

// ---------------------------------------------------------------------------
// Forks
// ---------------------------------------------------------------------------

/// POST /api/v1/stories/{id}/fork
///
/// Returns 409 if the caller already forked this story and 400 when forking
/// one's own story.
pub async fn fork(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let source_id = parse_id(&id)?;
    let new_id = fork_story(state.stories.as_ref(), source_id, auth.user_id).await?;

    tracing::info!(
        source_id = %source_id,
        fork_id = %new_id,
        owner_id = %auth.user_id,
        "Story forked",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedId { id: new_id },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Per-user listings
// ---------------------------------------------------------------------------

/// GET /api/v1/users/{user_id}/stories?page=&limit=
pub async fn list_by_owner(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let owner_id = parse_id(&user_id)?;
    let stories = state
        .stories
        .list_by_owner(owner_id, PageRequest::from(params))
        .await?;
    Ok(Json(DataResponse { data: stories }))
}

/// GET /api/v1/me/collaborations?page=&limit=
pub async fn my_collaborations(
    auth: AuthUser,
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let stories = state
        .stories
        .list_by_collaborator(auth.user_id, PageRequest::from(params))
        .await?;
    Ok(Json(DataResponse { data: stories }))
}

/// DELETE /api/v1/me/stories
///
/// Delete every story the caller owns. Succeeds when there are none.
pub async fn delete_mine(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.stories.delete_all_by_owner(auth.user_id).await?;

    tracing::info!(owner_id = %auth.user_id, "All owned stories deleted");

    Ok(Json(DataResponse {
        data: serde_json::json!({ "deleted": true }),
    }))
}
