//! # API Shared
//!
//! Shared utilities and definitions for the EMR APIs.
//!
//! Contains:
//! - Request/response types with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - Bearer-token authentication and role checks, independent of the HTTP framework
//!
//! Used by `api-rest` and the `cli`.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{authorise, bearer_token, AuthFailure};
pub use dto::*;
pub use health::HealthService;
