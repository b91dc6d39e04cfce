//! Route authorization policy.
//!
//! - No IO
//! - No panics
//! - Pure function of (subject, path)

use std::collections::BTreeSet;

use thiserror::Error;

use crate::{AuthenticatedSubject, Role};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthzFailure {
    #[error("forbidden: insufficient role")]
    Forbidden,

    #[error("no route matches the request path")]
    NotFound,
}

/// Path pattern a requirement applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    /// Matches the path exactly.
    Exact(String),
    /// Matches the path and everything below it, on segment boundaries.
    Prefix(String),
}

impl RoutePattern {
    pub fn exact(path: impl Into<String>) -> Self {
        Self::Exact(path.into())
    }

    pub fn prefix(path: impl Into<String>) -> Self {
        Self::Prefix(path.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(p) | Self::Prefix(p) => p,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(p) => path == p,
            Self::Prefix(p) => match path.strip_prefix(p.as_str()) {
                Some(rest) => rest.is_empty() || p.ends_with('/') || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

/// Roles required to reach one route pattern (any-of semantics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequirement {
    pattern: RoutePattern,
    roles: BTreeSet<Role>,
}

impl RouteRequirement {
    pub fn public(pattern: RoutePattern) -> Self {
        Self {
            pattern,
            roles: BTreeSet::new(),
        }
    }

    pub fn any_of(pattern: RoutePattern, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            pattern,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    /// A route without required roles needs no authentication at all.
    pub fn is_public(&self) -> bool {
        self.roles.is_empty()
    }

    /// Check a subject against this requirement.
    pub fn check(&self, subject: &AuthenticatedSubject) -> Result<(), AuthzFailure> {
        if self.is_public() || subject.has_any_role(&self.roles) {
            Ok(())
        } else {
            Err(AuthzFailure::Forbidden)
        }
    }
}

/// Static table of route requirements, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct RoutePolicy {
    routes: Vec<RouteRequirement>,
}

impl RoutePolicy {
    pub fn new(routes: impl IntoIterator<Item = RouteRequirement>) -> Self {
        Self {
            routes: routes.into_iter().collect(),
        }
    }

    /// `/` is public, `/admin` needs `admin`, `/user` needs `user` or `admin`.
    pub fn reference() -> Self {
        Self::new([
            RouteRequirement::public(RoutePattern::exact("/")),
            RouteRequirement::any_of(RoutePattern::prefix("/admin"), [Role::ADMIN]),
            RouteRequirement::any_of(RoutePattern::prefix("/user"), [Role::USER, Role::ADMIN]),
        ])
    }

    /// Resolve the requirement governing `path`.
    ///
    /// Exact patterns win; otherwise the longest matching prefix wins, so a
    /// catch-all `/` prefix only applies when nothing more specific does.
    pub fn resolve(&self, path: &str) -> Option<&RouteRequirement> {
        let exact = self
            .routes
            .iter()
            .find(|r| matches!(&r.pattern, RoutePattern::Exact(p) if p == path));
        if exact.is_some() {
            return exact;
        }

        self.routes
            .iter()
            .filter(|r| matches!(r.pattern, RoutePattern::Prefix(_)) && r.pattern.matches(path))
            .max_by_key(|r| r.pattern.as_str().len())
    }
}

/// Authorization component: decides whether a subject may reach a path.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationPolicy {
    routes: RoutePolicy,
}

impl AuthorizationPolicy {
    pub fn new(routes: RoutePolicy) -> Self {
        Self { routes }
    }

    /// Resolve `path` to its requirement, or `NotFound`.
    pub fn resolve(&self, path: &str) -> Result<&RouteRequirement, AuthzFailure> {
        self.routes.resolve(path).ok_or(AuthzFailure::NotFound)
    }

    /// Authorize a subject for `path`.
    pub fn authorize(&self, subject: &AuthenticatedSubject, path: &str) -> Result<(), AuthzFailure> {
        let requirement = self.resolve(path)?;
        let decision = requirement.check(subject);

        if decision.is_err() {
            tracing::info!(
                login = subject.login(),
                path,
                pattern = requirement.pattern().as_str(),
                "authorization denied"
            );
        }

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(roles: &[Role]) -> AuthenticatedSubject {
        AuthenticatedSubject::new("someone", roles.iter().cloned())
    }

    fn policy() -> AuthorizationPolicy {
        AuthorizationPolicy::new(RoutePolicy::reference())
    }

    #[test]
    fn admin_route_requires_admin_role() {
        let p = policy();
        assert_eq!(p.authorize(&subject(&[Role::ADMIN]), "/admin"), Ok(()));
        assert_eq!(
            p.authorize(&subject(&[Role::USER]), "/admin"),
            Err(AuthzFailure::Forbidden)
        );
    }

    #[test]
    fn user_route_accepts_user_or_admin() {
        let p = policy();
        assert_eq!(p.authorize(&subject(&[Role::USER]), "/user"), Ok(()));
        assert_eq!(p.authorize(&subject(&[Role::ADMIN]), "/user"), Ok(()));
        assert_eq!(
            p.authorize(&subject(&[Role::new("auditor")]), "/user"),
            Err(AuthzFailure::Forbidden)
        );
    }

    #[test]
    fn root_is_public_for_everyone() {
        assert_eq!(policy().authorize(&subject(&[]), "/"), Ok(()));
        assert!(policy().resolve("/").unwrap().is_public());
    }

    #[test]
    fn unmapped_path_is_not_found() {
        assert_eq!(
            policy().authorize(&subject(&[Role::ADMIN]), "/unknown"),
            Err(AuthzFailure::NotFound)
        );
    }

    #[test]
    fn prefix_matches_on_segment_boundaries() {
        let pattern = RoutePattern::prefix("/admin");
        assert!(pattern.matches("/admin"));
        assert!(pattern.matches("/admin/"));
        assert!(pattern.matches("/admin/users"));
        assert!(!pattern.matches("/administrator"));
        assert!(!pattern.matches("/"));
    }

    #[test]
    fn nested_paths_inherit_the_prefix_requirement() {
        assert_eq!(
            policy().authorize(&subject(&[Role::USER]), "/admin/settings"),
            Err(AuthzFailure::Forbidden)
        );
        assert_eq!(
            policy().authorize(&subject(&[Role::ADMIN]), "/administrator"),
            Err(AuthzFailure::NotFound)
        );
    }

    #[test]
    fn longest_prefix_wins_over_catch_all() {
        let p = AuthorizationPolicy::new(RoutePolicy::new([
            RouteRequirement::public(RoutePattern::prefix("/")),
            RouteRequirement::any_of(RoutePattern::prefix("/admin"), [Role::ADMIN]),
            RouteRequirement::any_of(RoutePattern::prefix("/admin/audit"), [Role::new("auditor")]),
        ]));

        assert!(p.resolve("/anything").unwrap().is_public());
        assert_eq!(p.resolve("/admin/x").unwrap().pattern().as_str(), "/admin");
        assert_eq!(p.resolve("/admin/audit/log").unwrap().pattern().as_str(), "/admin/audit");
        assert_eq!(
            p.authorize(&subject(&[Role::ADMIN]), "/admin/audit"),
            Err(AuthzFailure::Forbidden)
        );
    }

    #[test]
    fn exact_pattern_beats_prefix_for_the_same_path() {
        let p = AuthorizationPolicy::new(RoutePolicy::new([
            RouteRequirement::any_of(RoutePattern::prefix("/"), [Role::USER]),
            RouteRequirement::public(RoutePattern::exact("/")),
        ]));
        assert!(p.resolve("/").unwrap().is_public());
        assert!(!p.resolve("/other").unwrap().is_public());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn role_set() -> impl Strategy<Value = Vec<Role>> {
            proptest::collection::vec(
                prop_oneof![
                    Just(Role::ADMIN),
                    Just(Role::USER),
                    "[a-z]{1,8}".prop_map(Role::from),
                ],
                0..4,
            )
        }

        proptest! {
            #[test]
            fn admin_route_iff_admin_role(roles in role_set()) {
                let s = subject(&roles);
                let allowed = policy().authorize(&s, "/admin").is_ok();
                prop_assert_eq!(allowed, roles.contains(&Role::ADMIN));
            }

            #[test]
            fn user_route_iff_user_or_admin(roles in role_set()) {
                let s = subject(&roles);
                let allowed = policy().authorize(&s, "/user").is_ok();
                prop_assert_eq!(allowed, roles.contains(&Role::ADMIN) || roles.contains(&Role::USER));
            }

            #[test]
            fn root_always_allowed(roles in role_set()) {
                prop_assert!(policy().authorize(&subject(&roles), "/").is_ok());
            }

            #[test]
            fn unmapped_paths_are_not_found(roles in role_set(), tail in "[a-z]{1,10}") {
                prop_assume!(tail != "admin" && tail != "user");
                prop_assert_eq!(
                    policy().authorize(&subject(&roles), &format!("/{tail}")),
                    Err(AuthzFailure::NotFound)
                );
            }
        }
    }
}
