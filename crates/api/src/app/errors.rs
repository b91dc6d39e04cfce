use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use gatehouse_auth::{AuthFailure, AuthzFailure};

/// Why the gateway refused a request before it reached a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// `401` with a `WWW-Authenticate` challenge.
    Unauthenticated {
        failure: AuthFailure,
        challenge: HeaderValue,
    },
    /// `403`: authenticated, but none of the required roles.
    Forbidden,
    /// `404`: no route pattern matches the path.
    NotFound,
}

impl Rejection {
    pub fn unauthenticated(failure: AuthFailure, challenge: HeaderValue) -> Self {
        Self::Unauthenticated { failure, challenge }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl From<AuthzFailure> for Rejection {
    fn from(value: AuthzFailure) -> Self {
        match value {
            AuthzFailure::Forbidden => Self::Forbidden,
            AuthzFailure::NotFound => Self::NotFound,
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self {
            // Every authentication failure reads the same from the outside.
            Self::Unauthenticated { challenge, .. } => {
                let mut res = json_error(
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    "authentication required",
                );
                res.headers_mut().insert(header::WWW_AUTHENTICATE, challenge);
                res
            }
            Self::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "insufficient role"),
            Self::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
