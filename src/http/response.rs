//! Canned responses for the built-in handler kinds.
//!
//! # Design Decisions
//! - Redirection uses 302 Found regardless of method
//! - Bodies are short plain text; callers needing more mount a servlet

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;

/// Outcome for a denied pattern.
pub fn forbidden() -> Response<Body> {
    (StatusCode::FORBIDDEN, "Forbidden").into_response()
}

/// Outcome when nothing serves the request.
pub fn not_found() -> Response<Body> {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

pub fn bad_request() -> Response<Body> {
    (StatusCode::BAD_REQUEST, "Bad Request").into_response()
}

/// Redirect to `target`. A target that is not a valid header value is a
/// server-side misconfiguration.
pub fn redirect(target: &str) -> Response<Body> {
    match HeaderValue::from_str(target) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(_) => {
            tracing::error!(target = %target, "Redirection target is not a valid Location");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_sets_location() {
        let response = redirect("/web/index.html");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/web/index.html");
    }

    #[test]
    fn invalid_target_is_server_error() {
        let response = redirect("bad\nvalue");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn canned_statuses() {
        assert_eq!(forbidden().status(), StatusCode::FORBIDDEN);
        assert_eq!(not_found().status(), StatusCode::NOT_FOUND);
    }
}
