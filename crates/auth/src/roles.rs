use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application role.
///
/// The set is closed: every resolved identity carries exactly one of these.
/// Variants are ordered from most to least privileged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Director,
    #[serde(rename = "coordinador")]
    Coordinator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Director, Role::Coordinator];

    /// Role assigned when a token carries no recognizable role claim.
    pub const fn least_privileged() -> Self {
        Role::Coordinator
    }

    /// Canonical (lower-case) wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Director => "director",
            Role::Coordinator => "coordinador",
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

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical = canonicalize(s);
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == canonical)
            .ok_or(UnknownRole(s.to_string()))
    }
}

/// Roles required by a route or a view fragment.
///
/// Names are canonicalized once here (trimmed, lower-cased, de-duplicated) so
/// every comparison downstream is a plain equality check. Names outside the
/// closed role set are kept; they can never match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleRequirement(Vec<String>);

impl RoleRequirement {
    /// No restriction.
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = Vec::new();
        for role in roles {
            let name = canonicalize(role.as_ref());
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Self(names)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn allows(&self, role: Role) -> bool {
        self.0.iter().any(|r| r == role.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl From<&[Role]> for RoleRequirement {
    fn from(roles: &[Role]) -> Self {
        Self::new(roles.iter().map(Role::as_str))
    }
}

impl<const N: usize> From<[Role; N]> for RoleRequirement {
    fn from(roles: [Role; N]) -> Self {
        Self::from(&roles[..])
    }
}

impl<'de> Deserialize<'de> for RoleRequirement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::new(names))
    }
}

fn canonicalize(name: &str) -> String {
    name.trim().to_lowercase()
}
