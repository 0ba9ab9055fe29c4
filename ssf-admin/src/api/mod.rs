//! HTTP API handlers for ssf-admin

pub mod buildinfo;
pub mod entities;
pub mod export;
pub mod framework;
pub mod health;
pub mod import;
pub mod roles;

pub use buildinfo::get_build_info;
pub use entities::entity_routes;
pub use export::{export_combined, export_framework};
pub use framework::framework_routes;
pub use health::health_routes;
pub use import::import_table;
pub use roles::role_middleware;
