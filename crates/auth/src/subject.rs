use std::collections::BTreeSet;

use crate::Role;

/// The identity attached to a request after successful authentication.
///
/// Lives for a single request; handlers read it to personalize responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSubject {
    login: String,
    roles: BTreeSet<Role>,
}

impl AuthenticatedSubject {
    pub fn new(login: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            login: login.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    /// True when the subject holds at least one of `required`.
    pub fn has_any_role(&self, required: &BTreeSet<Role>) -> bool {
        !self.roles.is_disjoint(required)
    }
}
