//! Actor capability model
//!
//! Centralizes the owner / reviewer / admin authorization decisions that the
//! API layer makes before invoking assessment or review operations. Handlers
//! resolve the acting identity from gateway-supplied headers and consult this
//! module; no per-route role string comparisons exist anywhere else.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Role granted to an actor by the identity collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular user: owns their assessments, no review capability
    User,
    /// Reviewer: may read any completed assessment and work the triage queue
    Reviewer,
    /// Admin: reviewer capability plus cross-user history access
    Admin,
}

impl Role {
    /// Parse a role from its wire representation
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "reviewer" => Some(Role::Reviewer),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Reviewer => "reviewer",
            Role::Admin => "admin",
        }
    }
}

/// An authenticated actor, as resolved by the upstream identity collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    /// Whether this actor may read the assessment owned by `owner_id`
    ///
    /// Owners read their own records; reviewers and admins read any record
    /// (the review sub-record is shared with them).
    pub fn can_read_assessment(&self, owner_id: Uuid) -> bool {
        self.id == owner_id || matches!(self.role, Role::Reviewer | Role::Admin)
    }

    /// Whether this actor may list another user's assessment history
    pub fn can_read_history(&self, owner_id: Uuid) -> bool {
        self.id == owner_id || self.role == Role::Admin
    }

    /// Whether this actor may work the review triage queue
    pub fn can_review(&self) -> bool {
        matches!(self.role, Role::Reviewer | Role::Admin)
    }

    /// Whether this actor may submit an assessment on behalf of `user_id`
    pub fn can_submit_for(&self, user_id: Uuid) -> bool {
        self.id == user_id || self.role == Role::Admin
    }

    /// Require review capability, failing with `Forbidden` otherwise
    pub fn require_review(&self) -> Result<()> {
        if self.can_review() {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "actor {} ({}) lacks review capability",
                self.id,
                self.role.as_str()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor::new(Uuid::new_v4(), role)
    }

    #[test]
    fn test_role_parse_round_trip() {
        for role in [Role::User, Role::Reviewer, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_owner_reads_own_assessment() {
        let a = actor(Role::User);
        assert!(a.can_read_assessment(a.id));
        assert!(!a.can_read_assessment(Uuid::new_v4()));
    }

    #[test]
    fn test_reviewer_reads_any_assessment_but_not_history() {
        let a = actor(Role::Reviewer);
        let other = Uuid::new_v4();
        assert!(a.can_read_assessment(other));
        assert!(!a.can_read_history(other));
        assert!(a.can_review());
    }

    #[test]
    fn test_admin_has_all_capabilities() {
        let a = actor(Role::Admin);
        let other = Uuid::new_v4();
        assert!(a.can_read_assessment(other));
        assert!(a.can_read_history(other));
        assert!(a.can_review());
        assert!(a.can_submit_for(other));
    }

    #[test]
    fn test_user_cannot_review() {
        let a = actor(Role::User);
        assert!(!a.can_review());
        assert!(a.require_review().is_err());
    }
}
