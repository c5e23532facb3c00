//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - `Serialize` entity structs returned by the repository
//! - `Deserialize` request DTOs accepted by the HTTP layer
//! - insert inputs consumed by the repository

pub mod story;
