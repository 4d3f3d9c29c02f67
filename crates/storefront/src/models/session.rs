//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use bookshelf_core::UserId;

/// Session-stored user identity.
///
/// Written by the auth service after login; the storefront only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Whether the user may call `/api/admin` routes.
    #[serde(default)]
    pub is_admin: bool,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_admin_defaults_to_false() {
        let user: CurrentUser = serde_json::from_str(r#"{"id": 4}"#).unwrap();
        assert_eq!(user.id, UserId::new(4));
        assert!(!user.is_admin);
    }
}
