//! Authentication provider: resolves Basic credentials to a subject.

use std::sync::Arc;

use thiserror::Error;

use crate::{AuthenticatedSubject, CredentialStore, secret::constant_time_eq};

/// Authentication failure.
///
/// All variants surface as `401` with a realm challenge; an unknown login and
/// a wrong secret are deliberately the same variant.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("missing credentials")]
    MissingCredentials,

    #[error("malformed credentials")]
    MalformedCredentials,
}

/// Authentication contract used by the HTTP pipeline.
pub trait Authenticator: Send + Sync {
    /// Validate `supplied` for `login` and return the authenticated subject.
    fn authenticate(&self, login: &str, supplied: &[u8]) -> Result<AuthenticatedSubject, AuthFailure>;

    /// Realm presented in `WWW-Authenticate` challenges.
    fn realm(&self) -> &str;

    /// Value for the `WWW-Authenticate` response header.
    fn challenge(&self) -> String {
        basic_challenge(self.realm())
    }
}

/// `WWW-Authenticate` value for a Basic challenge in `realm`.
pub fn basic_challenge(realm: &str) -> String {
    format!("Basic realm=\"{}\"", realm.replace('"', "\\\""))
}

/// HTTP Basic authentication against an in-memory [`CredentialStore`].
#[derive(Debug, Clone)]
pub struct BasicAuthProvider {
    store: Arc<CredentialStore>,
    realm: String,
}

impl BasicAuthProvider {
    pub fn new(store: Arc<CredentialStore>, realm: impl Into<String>) -> Self {
        Self {
            store,
            realm: realm.into(),
        }
    }
}

impl Authenticator for BasicAuthProvider {
    fn authenticate(&self, login: &str, supplied: &[u8]) -> Result<AuthenticatedSubject, AuthFailure> {
        let Some(user) = self.store.lookup(login) else {
            // Burn the same comparison work as a real user so lookups don't leak.
            let _ = constant_time_eq(supplied, supplied);
            tracing::info!(login, outcome = "rejected", "authentication failed");
            return Err(AuthFailure::InvalidCredentials);
        };

        if !user.secret().matches(supplied) {
            tracing::info!(login, outcome = "rejected", "authentication failed");
            return Err(AuthFailure::InvalidCredentials);
        }

        tracing::debug!(login, outcome = "accepted", "authentication succeeded");
        Ok(AuthenticatedSubject::new(
            user.login(),
            user.roles().iter().cloned(),
        ))
    }

    fn realm(&self) -> &str {
        &self.realm
    }
}
