//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.

pub mod key_service;
