//! HTTP application wiring (Axum router + security pipeline).
//!
//! - `routes.rs`: route table and handlers
//! - `errors.rs`: rejection → response mapping

use axum::Router;
use tower::ServiceBuilder;

use crate::authz::AuthState;
use crate::middleware;

pub mod errors;
pub mod routes;

pub use routes::Greeting;

/// Build the full HTTP router: request span → security gate → handlers.
pub fn build_app(auth_state: AuthState, greeting: Greeting) -> Router {
    routes::router(greeting).layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(middleware::request_span))
            .layer(axum::middleware::from_fn_with_state(auth_state, middleware::gate)),
    )
}
