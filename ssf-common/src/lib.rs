//! # Shelter Severity Framework common library
//!
//! Shared code for the framework administration service:
//! - Database schema, entity models and store queries
//! - Framework transformations (code resolution, ref-code recalculation,
//!   grouping, CSV import/export)
//! - Role parsing for the HTTP layer
//! - Configuration loading
//! - Error types

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod framework;

pub use error::{Error, Result};
pub use framework::Level;
