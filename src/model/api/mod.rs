//! API-friendly types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Election and candidate IDs are plain integers.
//! - Datetimes are serialised as RFC 3339 strings.

pub mod auth;
pub mod candidate;
pub mod election;
pub mod receipt;
pub mod results;
