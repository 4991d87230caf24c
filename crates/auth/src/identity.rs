use serde::{Deserialize, Serialize};

use stockflow_core::UserId;

use crate::Role;

/// Request-scoped identity of the authenticated caller.
///
/// Built once by the transport middleware from validated claims and passed
/// explicitly into every core call; nothing downstream reads ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<Role>,
}

impl Identity {
    pub fn new(user_id: UserId, username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            username: username.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
