//! Session identity.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Who owns the collections of the current session.
///
/// A guest has no stable identity, so its collections only live on the
/// device. An account's collections live in remote persistence and are cached
/// in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "user_id", rename_all = "snake_case")]
pub enum Identity {
    #[default]
    Guest,
    Account(UserId),
}

impl Identity {
    /// Returns `true` when no account is attached.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }

    /// Returns the attached account, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Guest => None,
            Self::Account(user_id) => Some(*user_id),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest => write!(f, "guest"),
            Self::Account(user_id) => write!(f, "account:{user_id}"),
        }
    }
}

impl From<UserId> for Identity {
    fn from(user_id: UserId) -> Self {
        Self::Account(user_id)
    }
}
