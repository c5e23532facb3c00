//! Authentication primitives.
//!
//! - [`jwt`] -- bearer-token validation and lookup-token minting.

pub mod jwt;
