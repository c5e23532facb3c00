//! StoryHub core -- identifiers, domain errors, and pure policy logic.
//!
//! This crate has no I/O. The repository layer (`storyhub-db`) and the HTTP
//! service (`storyhub-api`) both build on the types defined here.

pub mod access;
pub mod error;
pub mod pagination;
pub mod types;
