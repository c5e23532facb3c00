//! StoryHub API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes, the
//! fork engine, the orphan reconciler, the server drain) so integration tests and the binary
//! entrypoint can both access them.

pub mod auth;
pub mod background;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod server;
pub mod state;
