//! Shared errors, configuration, and token handling for clubdocs.
//!
//! This crate provides the pieces every other crate leans on:
//! - Application-wide error type with HTTP status mapping
//! - Layered configuration (files + `CLUBDOCS__*` environment)
//! - JWT claims carrying the caller identity and role

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;

pub use auth::Claims;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtError, JwtService};
