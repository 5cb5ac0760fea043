//! Resolved application user.

use serde::{Deserialize, Serialize};

/// Capability group granted to every authenticated session.
pub const ADMIN_GROUP: &str = "admin";

/// The user an inbound agent request acts as.
///
/// Synthesized fresh for every request from the session cookie and never
/// persisted. `id` and `email` both carry the cookie value verbatim: the
/// cookie is the sole admission criterion, so the value is not required to
/// be a syntactically valid [`Email`](crate::Email).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier (the session email).
    pub id: String,
    /// Email carried by the session cookie.
    pub email: String,
    /// Capability groups this user belongs to.
    pub group_memberships: Vec<String>,
}

impl User {
    /// Build a user belonging to the [`ADMIN_GROUP`] only.
    #[must_use]
    pub fn admin(email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            id: email.clone(),
            email,
            group_memberships: vec![ADMIN_GROUP.to_owned()],
        }
    }

    /// Whether the user belongs to `group`.
    #[must_use]
    pub fn is_member_of(&self, group: &str) -> bool {
        self.group_memberships.iter().any(|g| g == group)
    }

    /// Whether the user belongs to at least one of `groups`.
    #[must_use]
    pub fn is_member_of_any<S: AsRef<str>>(&self, groups: &[S]) -> bool {
        groups.iter().any(|g| self.is_member_of(g.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_user_shape() {
        let user = User::admin("a@x.com");
        assert_eq!(user.id, "a@x.com");
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.group_memberships, vec!["admin".to_string()]);
    }

    #[test]
    fn test_membership() {
        let user = User::admin("a@x.com");
        assert!(user.is_member_of(ADMIN_GROUP));
        assert!(!user.is_member_of("viewer"));
        assert!(user.is_member_of_any(&["viewer", "admin"]));
        assert!(!user.is_member_of_any::<&str>(&[]));
    }
}
