//! Per-document access rules for the calling user.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::error::DocumentError;
use super::types::{Document, DocumentShare, PermissionLevel};

/// Club role supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Club administrator.
    Admin,
    /// Coach; reads every document.
    Coach,
    /// Athlete; owns their own documents.
    Athlete,
}

impl FromStr for Role {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "coach" => Ok(Self::Coach),
            "athlete" => Ok(Self::Athlete),
            other => Err(DocumentError::validation(format!("unknown role '{other}'"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Admin => "admin",
            Self::Coach => "coach",
            Self::Athlete => "athlete",
        })
    }
}

/// Authenticated caller, trusted as supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// User ID.
    pub user_id: i32,
    /// Club role.
    pub role: Role,
    /// Linked athlete profile.
    pub athlete_id: Option<i32>,
}

impl Actor {
    /// Build an admin actor.
    #[must_use]
    pub const fn admin(user_id: i32) -> Self {
        Self {
            user_id,
            role: Role::Admin,
            athlete_id: None,
        }
    }

    /// Build an athlete actor.
    #[must_use]
    pub const fn athlete(user_id: i32, athlete_id: i32) -> Self {
        Self {
            user_id,
            role: Role::Athlete,
            athlete_id: Some(athlete_id),
        }
    }

    /// True for admins.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail unless the actor is an admin.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Forbidden` for non-admins.
    pub fn require_admin(&self) -> Result<(), DocumentError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(DocumentError::forbidden("admin role required"))
        }
    }

    /// The athlete profile this actor may act for.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Forbidden` when no athlete profile is linked.
    pub fn own_athlete_id(&self) -> Result<i32, DocumentError> {
        self.athlete_id
            .ok_or_else(|| DocumentError::forbidden("no athlete profile linked to this user"))
    }

    /// Whether the actor may act on behalf of `athlete_id`.
    #[must_use]
    pub fn acts_for(&self, athlete_id: i32) -> bool {
        self.is_admin() || self.athlete_id == Some(athlete_id)
    }

    /// Effective permission on `document` given its shares.
    ///
    /// Admins and the owning athlete manage; coaches view at least; anyone
    /// else gets the level of their active share, if any.
    #[must_use]
    pub fn permission_on(
        &self,
        document: &Document,
        shares: &[DocumentShare],
        now: DateTime<Utc>,
    ) -> Option<PermissionLevel> {
        if self.acts_for(document.athlete_id) {
            return Some(PermissionLevel::Manage);
        }

        let shared = shares
            .iter()
            .filter(|s| s.document_id == document.id && s.shared_with == self.user_id)
            .filter(|s| s.is_active(now))
            .map(|s| s.permission_level)
            .max();

        match self.role {
            Role::Coach => shared.max(Some(PermissionLevel::View)),
            Role::Admin | Role::Athlete => shared,
        }
    }

    /// Fail unless the actor holds at least `needed` on `document`.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Forbidden` when the permission is missing.
    pub fn require(
        &self,
        needed: PermissionLevel,
        document: &Document,
        shares: &[DocumentShare],
        now: DateTime<Utc>,
    ) -> Result<(), DocumentError> {
        match self.permission_on(document, shares, now) {
            Some(level) if level >= needed => Ok(()),
            _ => Err(DocumentError::forbidden(format!(
                "{needed} permission required on document {}",
                document.id
            ))),
        }
    }
}
