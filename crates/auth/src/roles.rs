use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role granted to a user account.
///
/// The wire/storage names predate this service ("administrador"/"usuario");
/// unknown role strings are rejected at the boundary rather than carried
/// around as opaque text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "administrador")]
    Admin,
    #[serde(rename = "usuario")]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "administrador",
            Role::User => "usuario",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrador" => Ok(Role::Admin),
            "usuario" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// The single role → permission mapping.
///
/// Replaces per-route role string checks: handlers ask for a permission and
/// this table decides which roles carry it. `"*"` is the wildcard.
pub fn capabilities(role: &Role) -> &'static [&'static str] {
    match role {
        Role::Admin => &["*"],
        Role::User => &[
            "inventory.read",
            "requests.submit",
            "requests.read",
            "reports.read",
        ],
    }
}
