//! HTTP API layer for the ticket vault service
//!
//! REST endpoints covering the full ticket lifecycle: issuance, provider-side
//! validation, settlement, and vault accounting.

pub mod error;
mod handlers;

pub use error::{ApiError, ErrorCode};
pub use handlers::*;
