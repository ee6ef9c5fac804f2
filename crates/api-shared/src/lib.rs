//! # API Shared
//!
//! Wire types for the submission service's HTTP API.
//!
//! Contains:
//! - Request and response bodies (`types` module), all following the
//!   `{success, message?, ...payload}` envelope
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and by anything that needs to speak the same JSON.

pub mod health;
pub mod types;

pub use health::HealthService;
pub use types::*;
