//! Route definitions for stories and per-user story listings.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::story;
use crate::state::AppState;

/// Routes mounted at `/stories`.
///
/// ```text
/// GET    /                                  -> list (?page, limit, genres)
/// POST   /                                  -> create
/// GET    /{id}                              -> get_by_id
/// DELETE /{id}                              -> delete
/// GET    /{id}/content                      -> get_content
/// PUT    /{id}/content                      -> edit_content
/// GET    /{id}/collaborators                -> get_collaborators
/// POST   /{id}/collaborators                -> add_collaborator
/// DELETE /{id}/collaborators/{user_id}      -> remove_collaborator
/// POST   /{id}/fork                         -> fork
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(story::list).post(story::create))
        .route("/{id}", get(story::get_by_id).delete(story::delete))
        .route(
            "/{id}/content",
            get(story::get_content).put(story::edit_content),
        )
        .route(
            "/{id}/collaborators",
            get(story::get_collaborators).post(story::add_collaborator),
        )
        .route(
            "/{id}/collaborators/{user_id}",
            delete(story::remove_collaborator),
        )
        .route("/{id}/fork", post(story::fork))
}

/// Routes mounted at `/users`.
///
/// ```text
/// GET    /{user_id}/stories                 -> list_by_owner
/// ```
pub fn user_router() -> Router<AppState> {
    Router::new().route("/{user_id}/stories", get(story::list_by_owner))
}

/// Routes mounted at `/me`, scoped to the authenticated caller.
///
/// ```text
/// GET    /collaborations                    -> my_collaborations
/// DELETE /stories                           -> delete_mine
/// ```
pub fn me_router() -> Router<AppState> {
    Router::new()
        .route("/collaborations", get(story::my_collaborations))
        .route("/stories", delete(story::delete_mine))
}
