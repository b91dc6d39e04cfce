//! Users known to the gateway.

use std::collections::BTreeSet;

use crate::{Role, Secret};

/// A user record: login, credential and granted roles.
///
/// Built once from configuration and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct User {
    login: String,
    secret: Secret,
    roles: BTreeSet<Role>,
}

impl User {
    pub fn new(
        login: impl Into<String>,
        secret: impl Into<Secret>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            login: login.into(),
            secret: secret.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub(crate) fn secret(&self) -> &Secret {
        &self.secret
    }
}
