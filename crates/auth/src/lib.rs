//! `gatehouse-auth` — credential store, Basic authentication and route
//! authorization.
//!
//! This crate is intentionally decoupled from HTTP and storage: everything in
//! it is an immutable value or a pure function over such values.

pub mod authorize;
pub mod basic;
pub mod provider;
pub mod roles;
pub mod secret;
pub mod store;
pub mod subject;
pub mod user;

pub use authorize::{AuthorizationPolicy, AuthzFailure, RoutePattern, RoutePolicy, RouteRequirement};
pub use basic::BasicCredentials;
pub use provider::{AuthFailure, Authenticator, BasicAuthProvider, basic_challenge};
pub use roles::Role;
pub use secret::{Secret, constant_time_eq};
pub use store::{CredentialStore, CredentialStoreError};
pub use subject::AuthenticatedSubject;
pub use user::User;
