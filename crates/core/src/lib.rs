//! Document management domain logic for clubdocs.
//!
//! This crate contains pure domain logic with ZERO web or database dependencies.
//! Persistence is reached through the [`document::DocumentRepository`] trait,
//! which the db crate implements.
//!
//! # Modules
//!
//! - `document` - Document aggregate, review state machine, access rules,
//!   search filters, upload service and bulk orchestrator
//! - `storage` - Object storage adapter over Apache OpenDAL

pub mod document;
pub mod storage;
