//! Broadcast notification audiences and lifecycle.

use agora_core::{AppError, AppResult, NonEmptyString, PrincipalId};
use serde::{Deserialize, Serialize};

/// Recipients of a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastAudience {
    /// Every member profile.
    All,
    /// Members of one class.
    Class(NonEmptyString),
    /// A single member.
    User(PrincipalId),
}

impl BroadcastAudience {
    /// Builds an audience from the wire `targetType` and optional `targetId`.
    pub fn parse(target_type: &str, target_id: Option<&str>) -> AppResult<Self> {
        match (target_type, target_id) {
            ("all", _) => Ok(Self::All),
            ("class", Some(class_id)) => Ok(Self::Class(NonEmptyString::required(
                "targetId", class_id,
            )?)),
            ("user", Some(user_id)) => Ok(Self::User(user_id.parse()?)),
            ("class" | "user", None) => {
                Err(AppError::Validation("targetId is required".to_owned()))
            }
            (other, _) => Err(AppError::Validation(format!(
                "unknown broadcast target type '{other}'"
            ))),
        }
    }

    /// Returns the stored target type.
    #[must_use]
    pub fn target_type(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Class(_) => "class",
            Self::User(_) => "user",
        }
    }

    /// Returns the stored target id, if any.
    #[must_use]
    pub fn target_id(&self) -> Option<String> {
        match self {
            Self::All => None,
            Self::Class(class_id) => Some(class_id.to_string()),
            Self::User(user_id) => Some(user_id.to_string()),
        }
    }
}

/// Delivery state of a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastStatus {
    /// Waiting for an explicit send.
    Scheduled,
    /// Notifications fanned out.
    Sent,
}

impl BroadcastStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Sent => "sent",
        }
    }
}
