//! # API Shared
//!
//! Shared request/response definitions for the triage APIs.
//!
//! Contains:
//! - Wire types with OpenAPI schemas (`types` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest`.

pub mod health;
pub mod types;

pub use health::HealthService;
pub use types::*;
