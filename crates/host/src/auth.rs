//! API access control
//!
//! When an API token is configured, `/api` routes require
//! `Authorization: Bearer <token>`. Tokens are compared through HMAC-SHA256
//! verification so the comparison runs in constant time.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::api::AppState;

type HmacSha256 = Hmac<Sha256>;

const DIGEST_KEY: &[u8] = b"okd-deployer api token";

fn digest(token: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(DIGEST_KEY).expect("HMAC can take key of any size");
    mac.update(token.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Constant-time comparison of a presented token against the expected one
pub fn token_matches(expected: &str, presented: &str) -> bool {
    let mut mac = HmacSha256::new_from_slice(DIGEST_KEY).expect("HMAC can take key of any size");
    mac.update(presented.as_bytes());
    mac.verify_slice(&digest(expected)).is_ok()
}

/// Extract the token from an `Authorization: Bearer` header value
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

/// Reject requests without the configured bearer token
pub async fn require_api_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.api_token.as_deref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token);

    match presented {
        Some(token) if token_matches(expected, token) => next.run(request).await,
        _ => {
            warn!(path = %request.uri().path(), "Rejected request without valid API token");
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "status": "error", "message": "unauthorized" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches("s3cret", "s3cret"));
        assert!(!token_matches("s3cret", "s3cre"));
        assert!(!token_matches("s3cret", ""));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
