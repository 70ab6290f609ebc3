//! # API Shared
//!
//! Wire types and shared services for the MedPortal APIs.
//!
//! Contains:
//! - Request/response bodies for the auth, registration, share and lab endpoints (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by `medportal-core` for provider contracts and by `api-rest` for the HTTP surface, so
//! the JSON a provider returns is exactly what the REST API serves.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
