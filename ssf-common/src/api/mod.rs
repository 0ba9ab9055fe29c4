//! HTTP-framework-independent API helpers
//!
//! Pure functions only; the service wraps them in its own middleware.

pub mod roles;

pub use roles::{role_from_cookie_header, Role};
