//! Administrative role hierarchy.

use std::str::FromStr;

use agora_core::{AppError, PrincipalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Administrative roles, totally ordered `support < moderator < super_admin`.
///
/// This is the single hierarchy table shared by the authorization gate and
/// every presentation layer; nothing else should encode role ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Read-only operational access.
    Support,
    /// Content and user moderation.
    Moderator,
    /// Full administrative control.
    SuperAdmin,
}

impl AdminRole {
    /// Returns the numeric rank used for hierarchy comparison.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Support => 1,
            Self::Moderator => 2,
            Self::SuperAdmin => 3,
        }
    }

    /// Returns whether this role satisfies the required minimum role.
    #[must_use]
    pub fn has_role(self, required: Self) -> bool {
        self.rank() >= required.rank()
    }

    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Moderator => "moderator",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Returns all roles from lowest to highest rank.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[AdminRole] = &[
            AdminRole::Support,
            AdminRole::Moderator,
            AdminRole::SuperAdmin,
        ];

        ALL
    }
}

impl FromStr for AdminRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "support" => Ok(Self::Support),
            "moderator" => Ok(Self::Moderator),
            "super_admin" => Ok(Self::SuperAdmin),
            _ => Err(AppError::Validation(format!(
                "unknown admin role value '{value}'"
            ))),
        }
    }
}

/// Binding of one principal to an administrative role. At most one per principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRoleAssignment {
    /// Principal holding the role.
    #[serde(rename = "user_id")]
    pub principal_id: PrincipalId,
    /// Assigned role.
    pub role: AdminRole,
    /// Deactivated assignments are denied every action.
    pub is_active: bool,
    /// Flag shown to operators for private-message oversight.
    pub dm_access_enabled: bool,
    /// Principal that created the assignment.
    pub created_by: Option<PrincipalId>,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
}
