use std::sync::Arc;

use storyhub_db::repositories::StoryRepository;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Story storage; PostgreSQL in production, in-memory in tests.
    pub stories: Arc<dyn StoryRepository>,
    /// Server configuration (JWT secret for the auth extractor).
    pub config: Arc<ServerConfig>,
}
