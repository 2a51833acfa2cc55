//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Datetimes are serialised as RFC 3339 strings.
//! - Vote tallies come with a display rendering.

pub mod admin;
pub mod auth;
pub mod date_filter;
pub mod pagination;
pub mod question;
