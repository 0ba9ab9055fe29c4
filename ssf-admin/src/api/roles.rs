//! Role check middleware
//!
//! Reads the caller's role from the role cookie and rejects any mutating
//! request (anything but GET, HEAD and OPTIONS) from a caller who is not
//! `super-admin`. Recalculation only computes a preview, so it is open to
//! every role.

use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::Response,
};
use ssf_common::api::{role_from_cookie_header, Role};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

/// Paths that accept POST without changing stored data
const READ_ONLY_POSTS: [&str; 1] = ["/api/framework/recalculate"];

/// Role named by the request's cookies (`public` when absent)
pub fn request_role(request: &Request, cookie_name: &str) -> Role {
    let cookies: Vec<&str> = request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    role_from_cookie_header(&cookies.join("; "), cookie_name)
}

fn is_mutating(method: &Method, path: &str) -> bool {
    if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
        return false;
    }
    !(*method == Method::POST && READ_ONLY_POSTS.contains(&path))
}

pub async fn role_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_mutating(request.method(), request.uri().path()) {
        let role = request_role(&request, &state.role_cookie);
        if !role.can_write() {
            warn!(
                "Rejected {} {} for role {}",
                request.method(),
                request.uri().path(),
                role
            );
            return Err(ApiError::Forbidden(format!(
                "Role '{}' may not modify the framework",
                role
            )));
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutating_methods() {
        assert!(!is_mutating(&Method::GET, "/api/pillars"));
        assert!(!is_mutating(&Method::HEAD, "/api/pillars"));
        assert!(is_mutating(&Method::POST, "/api/pillars"));
        assert!(is_mutating(&Method::PUT, "/api/framework/tree"));
        assert!(is_mutating(&Method::DELETE, "/api/themes/3"));
        assert!(!is_mutating(&Method::POST, "/api/framework/recalculate"));
    }
}
