//! Client role claims → application authorities.
//!
//! Keycloak-style providers put per-client roles at
//! `resource_access.<client-id>.roles`. Only the entry for our own client id is
//! read; roles granted to other clients in the same token are ignored.
use std::{collections::BTreeSet, fmt};

use serde_json::{Map, Value};
use thiserror::Error;

use super::token::{ClaimPayload, value_kind};

const RESOURCE_ACCESS: &str = "resource_access";
const ROLES: &str = "roles";

/// A granted permission, always `ROLE_<UPPERCASE NAME>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Authority(String);

impl Authority {
    pub const PREFIX: &'static str = "ROLE_";

    /// Normalize a provider role name, e.g. `"admin"` → `ROLE_ADMIN`.
    pub fn from_role(role: &str) -> Self {
        Self(format!("{}{}", Self::PREFIX, role.trim().to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type AuthoritySet = BTreeSet<Authority>;

/// Where the role path stopped matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimShapeError {
    #[error("claim '{path}' is missing")]
    Missing { path: String },

    #[error("claim '{path}' is {found}, expected {expected}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Walk `resource_access.<client_id>.roles`, checking the shape at every step.
pub fn client_roles<'a>(
    payload: &'a ClaimPayload,
    client_id: &str,
) -> Result<&'a [Value], ClaimShapeError> {
    let resource_access = as_object(payload.get(RESOURCE_ACCESS), || RESOURCE_ACCESS.to_owned())?;
    let client = as_object(resource_access.get(client_id), || {
        format!("{RESOURCE_ACCESS}.{client_id}")
    })?;

    let path = || format!("{RESOURCE_ACCESS}.{client_id}.{ROLES}");
    match client.get(ROLES) {
        Some(Value::Array(roles)) => Ok(roles.as_slice()),
        Some(other) => Err(ClaimShapeError::WrongType {
            path: path(),
            expected: "array",
            found: value_kind(other),
        }),
        None => Err(ClaimShapeError::Missing { path: path() }),
    }
}

fn as_object<'a>(
    value: Option<&'a Value>,
    path: impl FnOnce() -> String,
) -> Result<&'a Map<String, Value>, ClaimShapeError> {
    match value {
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(ClaimShapeError::WrongType {
            path: path(),
            expected: "object",
            found: value_kind(other),
        }),
        None => Err(ClaimShapeError::Missing { path: path() }),
    }
}

/// Map the client's roles to authorities.
///
/// A token without roles for this client is not an error: it simply grants
/// nothing, so role-gated routes will deny it.
pub fn extract_authorities(payload: &ClaimPayload, client_id: &str) -> AuthoritySet {
    let roles = match client_roles(payload, client_id) {
        Ok(roles) => roles,
        Err(err) => {
            tracing::debug!(client_id, error = %err, "no client roles in token");
            return AuthoritySet::new();
        }
    };

    roles
        .iter()
        .filter_map(Value::as_str)
        .filter(|role| !role.trim().is_empty())
        .map(Authority::from_role)
        .collect()
}
