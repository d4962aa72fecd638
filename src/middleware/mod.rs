//! HTTP middleware components.
//!
//! Middleware run before route handlers and can short-circuit requests
//! (reject unauthorized) before any body is read.

/// Dashboard shared-secret authentication
pub mod auth;
