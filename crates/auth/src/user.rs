use serde::{Deserialize, Serialize};

use stockflow_core::{UserId, WorkflowError, WorkflowResult};

use crate::Role;

/// A user account in the directory.
///
/// Carries identity and role only; credentials and token issuance live
/// outside this service. Used for administration and for joining requester
/// names onto request listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl UserAccount {
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> WorkflowResult<Self> {
        let username = username.into();
        let email = email.into();
        if username.trim().is_empty() {
            return Err(WorkflowError::validation("username cannot be empty"));
        }
        if !email.contains('@') {
            return Err(WorkflowError::validation("email is not valid"));
        }
        Ok(Self {
            id,
            username,
            email,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_username_and_email() {
        assert!(UserAccount::new(UserId::new(), "", "a@b.co", Role::User).is_err());
        assert!(UserAccount::new(UserId::new(), "ana", "not-an-email", Role::User).is_err());

        let u = UserAccount::new(UserId::new(), "ana", "ana@example.com", Role::Admin).unwrap();
        assert_eq!(u.role, Role::Admin);
    }
}
