//! Request-level security pipeline: resolve route → authenticate → authorize.
//!
//! The route is resolved first so unmapped paths answer `404` without asking
//! for credentials, and public routes never touch the credential store.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::http::header::InvalidHeaderValue;

use gatehouse_auth::{AuthFailure, AuthenticatedSubject, Authenticator, AuthorizationPolicy, BasicCredentials};

use crate::app::errors::Rejection;

/// Shared, immutable security state handed to the gate middleware.
#[derive(Clone)]
pub struct AuthState {
    pub authenticator: Arc<dyn Authenticator>,
    pub policy: Arc<AuthorizationPolicy>,
    challenge: HeaderValue,
}

impl AuthState {
    /// Fails when the authenticator's challenge is not a valid header value
    /// (e.g. a realm containing control characters).
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        policy: Arc<AuthorizationPolicy>,
    ) -> Result<Self, InvalidHeaderValue> {
        let challenge = HeaderValue::from_str(&authenticator.challenge())?;
        Ok(Self {
            authenticator,
            policy,
            challenge,
        })
    }

    pub fn challenge(&self) -> &HeaderValue {
        &self.challenge
    }

    fn unauthenticated(&self, failure: AuthFailure) -> Rejection {
        Rejection::unauthenticated(failure, self.challenge.clone())
    }
}

/// Decide whether a request for `path` may reach its handler.
///
/// Returns the authenticated subject for protected routes and `None` for
/// public ones.
pub fn authorize_request(
    state: &AuthState,
    path: &str,
    authorization: Option<&HeaderValue>,
) -> Result<Option<AuthenticatedSubject>, Rejection> {
    let requirement = state.policy.resolve(path)?;
    if requirement.is_public() {
        return Ok(None);
    }

    let header = authorization
        .map(|v| v.to_str().map_err(|_| AuthFailure::MalformedCredentials))
        .transpose()
        .map_err(|f| state.unauthenticated(f))?;

    let credentials = BasicCredentials::from_header(header).map_err(|f| state.unauthenticated(f))?;

    let subject = state
        .authenticator
        .authenticate(&credentials.login, credentials.secret.expose())
        .map_err(|f| state.unauthenticated(f))?;

    state.policy.authorize(&subject, path)?;

    Ok(Some(subject))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose};
    use gatehouse_auth::{BasicAuthProvider, CredentialStore, Role, RoutePolicy, User, basic_challenge};

    fn state() -> AuthState {
        let store = CredentialStore::from_users([
            User::new("ben", "s1", [Role::USER, Role::ADMIN]),
            User::new("mike", "s2", [Role::USER]),
        ])
        .unwrap();
        AuthState::new(
            Arc::new(BasicAuthProvider::new(Arc::new(store), "gatehouse")),
            Arc::new(AuthorizationPolicy::new(RoutePolicy::reference())),
        )
        .unwrap()
    }

    fn basic(login: &str, secret: &str) -> HeaderValue {
        let encoded = general_purpose::STANDARD.encode(format!("{login}:{secret}"));
        HeaderValue::from_str(&format!("Basic {encoded}")).unwrap()
    }

    #[test]
    fn public_route_needs_no_credentials() {
        assert_eq!(authorize_request(&state(), "/", None), Ok(None));
    }

    #[test]
    fn public_route_ignores_bad_credentials() {
        let header = basic("ben", "wrong");
        assert_eq!(authorize_request(&state(), "/", Some(&header)), Ok(None));
    }

    #[test]
    fn unmapped_route_is_not_found_before_authentication() {
        assert_eq!(authorize_request(&state(), "/nope", None), Err(Rejection::NotFound));
    }

    #[test]
    fn protected_route_without_credentials_is_challenged() {
        let err = authorize_request(&state(), "/admin", None).unwrap_err();
        assert_eq!(
            err,
            Rejection::unauthenticated(
                AuthFailure::MissingCredentials,
                HeaderValue::from_static("Basic realm=\"gatehouse\"")
            )
        );
    }

    #[test]
    fn wrong_secret_is_challenged() {
        let header = basic("ben", "wrong");
        let err = authorize_request(&state(), "/admin", Some(&header)).unwrap_err();
        assert!(matches!(
            err,
            Rejection::Unauthenticated {
                failure: AuthFailure::InvalidCredentials,
                ..
            }
        ));
    }

    #[test]
    fn valid_subject_without_role_is_forbidden() {
        let header = basic("mike", "s2");
        assert_eq!(
            authorize_request(&state(), "/admin", Some(&header)),
            Err(Rejection::Forbidden)
        );
    }

    #[test]
    fn admin_reaches_both_protected_routes() {
        let header = basic("ben", "s1");
        for path in ["/admin", "/user"] {
            let subject = authorize_request(&state(), path, Some(&header)).unwrap().unwrap();
            assert_eq!(subject.login(), "ben");
        }
    }

    #[test]
    fn non_ascii_header_is_malformed() {
        let header = HeaderValue::from_bytes(b"Basic \xff\xfe").unwrap();
        let err = authorize_request(&state(), "/user", Some(&header)).unwrap_err();
        assert!(matches!(
            err,
            Rejection::Unauthenticated {
                failure: AuthFailure::MalformedCredentials,
                ..
            }
        ));
    }

    #[test]
    fn realm_that_cannot_form_a_challenge_is_rejected() {
        let provider = BasicAuthProvider::new(Arc::new(CredentialStore::default()), "line\nbreak");
        let policy = Arc::new(AuthorizationPolicy::new(RoutePolicy::reference()));
        assert!(AuthState::new(Arc::new(provider), policy).is_err());
    }

    #[test]
    fn non_ascii_realm_still_forms_a_challenge() {
        let provider = BasicAuthProvider::new(Arc::new(CredentialStore::default()), "Gatehouse™");
        let policy = Arc::new(AuthorizationPolicy::new(RoutePolicy::reference()));
        let state = AuthState::new(Arc::new(provider), policy).unwrap();
        assert_eq!(state.challenge().as_bytes(), basic_challenge("Gatehouse™").as_bytes());
    }
}
