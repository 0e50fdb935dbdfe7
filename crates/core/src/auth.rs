use serde::{Deserialize, Serialize};

use crate::PrincipalId;

/// Caller resolved from a bearer credential for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: PrincipalId,
    email: Option<String>,
}

impl Principal {
    /// Creates a principal from identity provider data.
    #[must_use]
    pub fn new(id: PrincipalId, email: Option<String>) -> Self {
        Self { id, email }
    }

    /// Returns the identity provider's stable id for the caller.
    #[must_use]
    pub fn id(&self) -> PrincipalId {
        self.id
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
