pub mod health;
pub mod story;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /stories                                   list (public), create (auth)
/// /stories/{id}                              get (public), delete (owner)
/// /stories/{id}/content                      get (public), edit (owner or collaborator)
/// /stories/{id}/collaborators                list (public), add (owner)
/// /stories/{id}/collaborators/{user_id}      remove (owner)
/// /stories/{id}/fork                         fork (auth, not the owner)
///
/// /users/{user_id}/stories                   stories owned by a user (public)
///
/// /me/collaborations                         stories the caller collaborates on
/// /me/stories                                delete every story the caller owns
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/stories", story::router())
        .nest("/users", story::user_router())
        .nest("/me", story::me_router())
}
