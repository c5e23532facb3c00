//! Multi-step story workflows that span both story tables.

pub mod fork;
