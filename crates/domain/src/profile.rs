//! Member profile types touched by moderation.

use std::str::FromStr;

use agora_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Verification badge kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
    /// No badge.
    None,
    /// Verified individual.
    Verified,
    /// Verified creator.
    Creator,
    /// Verified institution.
    Institution,
}

impl VerificationType {
    /// Returns a stable storage value for this badge.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Verified => "verified",
            Self::Creator => "creator",
            Self::Institution => "institution",
        }
    }

    /// Returns whether the badge is shown at all.
    #[must_use]
    pub fn is_verified(self) -> bool {
        self != Self::None
    }
}

/// Profile columns an administrator may edit directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditableProfileField {
    /// Public handle.
    Handle,
    /// Display name.
    DisplayName,
    /// Full name.
    FullName,
    /// Biography text.
    Bio,
    /// Avatar image URL.
    AvatarUrl,
    /// Cover image URL.
    CoverUrl,
    /// Private account flag.
    IsPrivate,
}

impl EditableProfileField {
    /// Returns the profile column name.
    #[must_use]
    pub fn column(&self) -> &'static str {
        match self {
            Self::Handle => "handle",
            Self::DisplayName => "display_name",
            Self::FullName => "full_name",
            Self::Bio => "bio",
            Self::AvatarUrl => "avatar_url",
            Self::CoverUrl => "cover_url",
            Self::IsPrivate => "is_private",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::IsPrivate => value.is_boolean(),
            Self::Handle => value.as_str().is_some_and(|handle| !handle.trim().is_empty()),
            _ => value.is_string() || value.is_null(),
        }
    }
}

impl FromStr for EditableProfileField {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "handle" => Ok(Self::Handle),
            "display_name" => Ok(Self::DisplayName),
            "full_name" => Ok(Self::FullName),
            "bio" => Ok(Self::Bio),
            "avatar_url" => Ok(Self::AvatarUrl),
            "cover_url" => Ok(Self::CoverUrl),
            "is_private" => Ok(Self::IsPrivate),
            _ => Err(AppError::Validation(format!(
                "profile field '{value}' cannot be edited"
            ))),
        }
    }
}

/// Validated set of direct profile edits.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileEdits(Vec<(EditableProfileField, Value)>);

impl ProfileEdits {
    /// Validates a raw `updates` object.
    pub fn from_updates(updates: &Map<String, Value>) -> AppResult<Self> {
        if updates.is_empty() {
            return Err(AppError::Validation("updates is required".to_owned()));
        }

        let mut edits = Vec::with_capacity(updates.len());
        for (key, value) in updates {
            let field = EditableProfileField::from_str(key)?;
            if !field.accepts(value) {
                return Err(AppError::Validation(format!(
                    "invalid value for profile field '{key}'"
                )));
            }
            edits.push((field, value.clone()));
        }

        Ok(Self(edits))
    }

    /// Returns the edits in submission order.
    #[must_use]
    pub fn fields(&self) -> &[(EditableProfileField, Value)] {
        &self.0
    }

    /// Returns the edits as a JSON object for audit after-state.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(field, value)| (field.column().to_owned(), value.clone()))
                .collect(),
        )
    }
}

/// Validated, lower-cased email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one `@`,
    /// local part and domain are non-empty.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let normalized = value.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(AppError::Validation("email is required".to_owned()));
        }

        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain '@'".to_owned(),
            ));
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(AppError::Validation(
                "email address is malformed".to_owned(),
            ));
        }

        Ok(Self(normalized))
    }

    /// Returns the normalized email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{EmailAddress, ProfileEdits};

    #[test]
    fn email_is_trimmed_and_lowercased() {
        let email = EmailAddress::new("  Mod@Example.COM ");
        assert!(matches!(email, Ok(value) if value.as_str() == "mod@example.com"));
    }

    #[test]
    fn blank_email_is_rejected() {
        assert!(EmailAddress::new("   ").is_err());
        assert!(EmailAddress::new("no-at-sign").is_err());
    }

    #[test]
    fn profile_edits_accept_whitelisted_columns() {
        let updates = json!({ "bio": "hello", "is_private": true });
        let Some(updates) = updates.as_object() else {
            panic!("fixture should be an object");
        };
        let edits = ProfileEdits::from_updates(updates);
        assert!(matches!(edits, Ok(value) if value.fields().len() == 2));
    }

    #[test]
    fn profile_edits_reject_protected_columns() {
        let updates = json!({ "is_locked": false });
        let Some(updates) = updates.as_object() else {
            panic!("fixture should be an object");
        };
        assert!(ProfileEdits::from_updates(updates).is_err());
    }

    #[test]
    fn profile_edits_reject_empty_object() {
        assert!(ProfileEdits::from_updates(&serde_json::Map::new()).is_err());
    }
}
