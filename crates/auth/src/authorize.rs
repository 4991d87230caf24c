use thiserror::Error;

use crate::{capabilities, Identity, Permission};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize an identity against a required permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure capability check)
pub fn authorize(identity: &Identity, required: &Permission) -> Result<(), AuthzError> {
    let required_str = required.as_str();
    let granted = identity.roles.iter().any(|role| {
        capabilities(role)
            .iter()
            .any(|cap| *cap == "*" || *cap == required_str)
    });

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required_str.to_string()))
    }
}
