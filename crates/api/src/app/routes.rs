use std::sync::Arc;

use axum::{
    Extension, Router,
    response::{IntoResponse, Response},
    routing::get,
};

use gatehouse_auth::AuthenticatedSubject;

use crate::app::errors::Rejection;

/// Static body served by the public root route.
#[derive(Debug, Clone)]
pub struct Greeting(Arc<str>);

impl Greeting {
    pub fn new(text: &str) -> Self {
        Self(Arc::from(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Route table. Access rules live in the route policy, not here.
pub fn router(greeting: Greeting) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/admin", get(admin))
        .route("/user", get(user))
        .fallback(not_found)
        .layer(Extension(greeting))
}

pub async fn root(Extension(greeting): Extension<Greeting>) -> String {
    format!("{}\n", greeting.as_str())
}

pub async fn admin(Extension(subject): Extension<AuthenticatedSubject>) -> String {
    format!("Greetings from the admin, {}!\n", subject.login())
}

pub async fn user(Extension(subject): Extension<AuthenticatedSubject>) -> String {
    format!("Greetings from the user, {}!\n", subject.login())
}

pub async fn not_found() -> Response {
    Rejection::NotFound.into_response()
}
