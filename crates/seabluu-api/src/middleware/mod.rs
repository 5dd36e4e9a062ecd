//! HTTP middleware for the web admin.
pub mod auth;
