//! In-memory credential store.

use std::collections::HashMap;

use thiserror::Error;

use crate::User;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialStoreError {
    #[error("user login must not be empty")]
    EmptyLogin,

    #[error("duplicate user login '{0}'")]
    DuplicateLogin(String),
}

/// Read-only snapshot of every user the gateway accepts.
///
/// Nothing mutates the store after construction, so it can be shared behind an
/// `Arc` and read from any number of request tasks without locking.
#[derive(Debug, Default)]
pub struct CredentialStore {
    users: HashMap<String, User>,
}

impl CredentialStore {
    /// Build a store from an ordered list of users.
    ///
    /// Logins must be non-empty and unique.
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Result<Self, CredentialStoreError> {
        let mut map = HashMap::new();

        for user in users {
            if user.login().is_empty() {
                return Err(CredentialStoreError::EmptyLogin);
            }
            if user.roles().is_empty() {
                tracing::warn!(login = user.login(), "user has no roles; protected routes will reject it");
            }
            if map.contains_key(user.login()) {
                return Err(CredentialStoreError::DuplicateLogin(user.login().to_string()));
            }
            map.insert(user.login().to_string(), user);
        }

        Ok(Self { users: map })
    }

    /// Find a user by login. Unknown logins are not an error.
    pub fn lookup(&self, login: &str) -> Option<&User> {
        self.users.get(login)
    }

    /// All stored logins, sorted.
    pub fn logins(&self) -> Vec<&str> {
        let mut logins: Vec<&str> = self.users.keys().map(String::as_str).collect();
        logins.sort_unstable();
        logins
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
