use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::app::errors::Rejection;
use crate::authz::{self, AuthState};

/// Security gate in front of every handler.
///
/// On success the [`gatehouse_auth::AuthenticatedSubject`] (if any) is stored
/// in the request extensions for handlers to read.
pub async fn gate(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Rejection> {
    let path = req.uri().path().to_owned();
    let subject = authz::authorize_request(&state, &path, req.headers().get(header::AUTHORIZATION))?;

    if let Some(subject) = subject {
        req.extensions_mut().insert(subject);
    }

    Ok(next.run(req).await)
}

/// Wrap each request in a span carrying a fresh request id.
pub async fn request_span(req: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "http.request",
        request_id = %Uuid::now_v7(),
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        let res = next.run(req).await;
        tracing::info!(status = res.status().as_u16(), "request completed");
        res
    }
    .instrument(span)
    .await
}
