//! User identities supplied by the external identity provider
//!
//! Doctors and patients are profiles attached to a user identity. The
//! identity owns the numeric id and the name that legacy mirrors copy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::validation::{validate_max_len, ValidationErrorCode, ValidationErrors, ValidationResult};

/// Numeric identifier assigned by the identity provider.
pub type UserId = u64;

/// A user record as handed out by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserIdentity {
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// First and last name joined by a single space. Blank names are kept
    /// as-is so the output matches what older consumers already stored.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.id == 0 {
            result.add_error("id", "User id must be a positive integer", ValidationErrorCode::OutOfRange);
        }
        if self.username.trim().is_empty() {
            result.add_error("username", "Username is required", ValidationErrorCode::Required);
        }
        result.merge(validate_max_len(&self.username, "username", 150));
        result.merge(validate_max_len(&self.first_name, "first_name", 150));
        result.merge(validate_max_len(&self.last_name, "last_name", 150));

        result
    }
}

/// Lookup of user identities by id.
pub trait IdentityProvider {
    fn identity(&self, id: UserId) -> Option<UserIdentity>;
}

/// In-memory identity provider.
#[derive(Clone, Debug, Default)]
pub struct IdentityDirectory {
    users: BTreeMap<UserId, UserIdentity>,
}

impl IdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new identity. Ids and usernames are unique.
    pub fn register(&mut self, identity: UserIdentity) -> Result<(), ValidationErrors> {
        identity.validate().into_result()?;

        if self.users.contains_key(&identity.id) {
            return Err(ValidationErrors::single(
                "id",
                &format!("User id {} is already registered", identity.id),
                ValidationErrorCode::DuplicateValue,
            ));
        }
        if self.users.values().any(|u| u.username == identity.username) {
            return Err(ValidationErrors::single(
                "username",
                "A user with that username already exists",
                ValidationErrorCode::DuplicateValue,
            ));
        }

        self.users.insert(identity.id, identity);
        Ok(())
    }

    /// Change a user's name. Returns `false` when the id is unknown.
    pub fn rename(&mut self, id: UserId, first_name: &str, last_name: &str) -> bool {
        match self.users.get_mut(&id) {
            Some(user) => {
                user.first_name = first_name.to_string();
                user.last_name = last_name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl IdentityProvider for IdentityDirectory {
    fn identity(&self, id: UserId) -> Option<UserIdentity> {
        self.users.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let user = UserIdentity::new(7, "ab", "A", "B");
        assert_eq!(user.display_name(), "A B");

        // Users created without names still render the joining space
        let nameless = UserIdentity::new(8, "testdoc", "", "");
        assert_eq!(nameless.display_name(), " ");
    }

    #[test]
    fn test_identity_validation() {
        assert!(UserIdentity::new(1, "alice", "Alice", "Johnson").validate().is_valid());

        let result = UserIdentity::new(0, "", "", "").validate();
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["id", "username"]);
    }

    #[test]
    fn test_directory_rejects_duplicates() {
        let mut directory = IdentityDirectory::new();
        directory.register(UserIdentity::new(1, "alice", "Alice", "J")).unwrap();

        let dup_id = directory.register(UserIdentity::new(1, "other", "O", "T")).unwrap_err();
        assert!(dup_id.has_code("id", ValidationErrorCode::DuplicateValue));

        let dup_name = directory.register(UserIdentity::new(2, "alice", "A", "K")).unwrap_err();
        assert!(dup_name.has_code("username", ValidationErrorCode::DuplicateValue));

        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_rename() {
        let mut directory = IdentityDirectory::new();
        directory.register(UserIdentity::new(3, "carol", "Carol", "Ng")).unwrap();

        assert!(directory.rename(3, "Caroline", "Ng"));
        assert_eq!(directory.identity(3).unwrap().display_name(), "Caroline Ng");
        assert!(!directory.rename(99, "X", "Y"));
    }
}
