//! License Key Service
//!
//! A REST API for issuing software license keys and verifying them from client
//! applications. Keys can be locked to the first hardware id (HWID) that
//! verifies them, can expire, and can be disabled from the dashboard.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Persistence**: `keys` table in PostgreSQL (sqlx), Supabase/PostgREST (reqwest) or memory
//! - **Authentication**: shared dashboard password on management routes; verification is public
//! - **Format**: JSON requests/responses

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

pub use app::{AppState, build_router};
