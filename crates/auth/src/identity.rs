//! Canonical identity resolved from token claims.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Claims, Role};

/// User identifier as carried by the token: numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubjectId {
    Number(i64),
    Text(String),
}

impl SubjectId {
    /// Sentinel used when the token names no subject.
    pub const UNKNOWN: SubjectId = SubjectId::Number(0);

    fn from_claim(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_i64().map_or_else(|| Self::Text(n.to_string()), Self::Number),
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl Default for SubjectId {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl core::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SubjectId::Number(n) => core::fmt::Display::fmt(n, f),
            SubjectId::Text(s) => f.write_str(s),
        }
    }
}

/// The current user, as far as the client can tell from its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: SubjectId,
    pub username: Option<String>,
    pub role: Role,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Untouched payload, for diagnostics.
    pub raw_claims: Claims,
}

const SUBJECT_KEYS: &[&str] = &["sub", "user_id", "id"];
const USERNAME_KEYS: &[&str] = &["preferred_username", "username", "usuario"];
const NAME_KEYS: &[&str] = &["name", "nombre"];
const EMAIL_KEYS: &[&str] = &["email", "correo"];

/// One way a token may express its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSource {
    /// A single role name under any of the given keys.
    Single(&'static [&'static str]),
    /// A list of role names; the first known one wins.
    List(&'static str),
    /// A whitespace-separated scope string; the first known token wins.
    Scope(&'static str),
}

/// Role extraction precedence: first source yielding a known role wins.
pub const ROLE_SOURCES: &[RoleSource] = &[
    RoleSource::Single(&["role", "rol"]),
    RoleSource::List("roles"),
    RoleSource::Scope("scope"),
];

impl RoleSource {
    pub fn extract(&self, claims: &Claims) -> Option<Role> {
        match self {
            RoleSource::Single(keys) => keys
                .iter()
                .filter_map(|k| claims.get(k)?.as_str())
                .find_map(|name| name.parse().ok()),
            RoleSource::List(key) => claims
                .get(key)?
                .as_array()?
                .iter()
                .filter_map(Value::as_str)
                .find_map(|name| name.parse().ok()),
            RoleSource::Scope(key) => claims
                .get(key)?
                .as_str()?
                .split_whitespace()
                .find_map(|name| name.parse().ok()),
        }
    }
}

/// Try `sources` in order; fall back to the least privileged role.
pub fn resolve_role(claims: &Claims, sources: &[RoleSource]) -> Role {
    sources
        .iter()
        .find_map(|source| source.extract(claims))
        .unwrap_or(Role::least_privileged())
}

/// Map raw claims to an [`Identity`]. Never fails.
pub fn resolve_identity(claims: Claims) -> Identity {
    let id = claims
        .first_of(SUBJECT_KEYS)
        .map(SubjectId::from_claim)
        .unwrap_or_default();

    Identity {
        id,
        username: text_claim(&claims, USERNAME_KEYS),
        role: resolve_role(&claims, ROLE_SOURCES),
        name: text_claim(&claims, NAME_KEYS),
        email: text_claim(&claims, EMAIL_KEYS),
        raw_claims: claims,
    }
}

fn text_claim(claims: &Claims, keys: &[&str]) -> Option<String> {
    claims.first_of(keys).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn claims(value: Value) -> Claims {
        Claims::try_from(value).unwrap()
    }

    #[test]
    fn list_beats_scope() {
        let identity = resolve_identity(claims(json!({ "roles": ["director"], "scope": "admin" })));
        assert_eq!(identity.role, Role::Director);
    }

    #[test]
    fn missing_role_defaults_to_least_privileged() {
        let identity = resolve_identity(claims(json!({ "sub": 7 })));
        assert_eq!(identity.id, SubjectId::Number(7));
        assert_eq!(identity.role, Role::Coordinator);
    }

    #[test]
    fn single_role_beats_list() {
        let identity = resolve_identity(claims(json!({ "rol": "admin", "roles": ["director"] })));
        assert_eq!(identity.role, Role::Admin);
    }

    #[test]
    fn unknown_single_role_falls_through() {
        let identity = resolve_identity(claims(json!({ "role": "superuser", "scope": "openid director" })));
        assert_eq!(identity.role, Role::Director);
    }

    #[test]
    fn list_skips_unknown_entries() {
        let identity = resolve_identity(claims(json!({ "roles": ["viewer", 3, "Admin"] })));
        assert_eq!(identity.role, Role::Admin);
    }

    #[test]
    fn scope_splits_on_whitespace() {
        let c = claims(json!({ "scope": "openid  profile\tcoordinador" }));
        assert_eq!(RoleSource::Scope("scope").extract(&c), Some(Role::Coordinator));
    }

    #[test]
    fn subject_aliases_in_order() {
        assert_eq!(resolve_identity(claims(json!({ "user_id": "u-9", "id": 3 }))).id, SubjectId::Text("u-9".into()));
        assert_eq!(resolve_identity(claims(json!({ "id": 3 }))).id, SubjectId::Number(3));
        assert_eq!(resolve_identity(claims(json!({}))).id, SubjectId::UNKNOWN);
    }

    #[test]
    fn profile_aliases() {
        let identity = resolve_identity(claims(json!({
            "usuario": "mlopez",
            "nombre": "María López",
            "correo": "mlopez@example.edu",
        })));
        assert_eq!(identity.username.as_deref(), Some("mlopez"));
        assert_eq!(identity.name.as_deref(), Some("María López"));
        assert_eq!(identity.email.as_deref(), Some("mlopez@example.edu"));

        let preferred = resolve_identity(claims(json!({ "preferred_username": "a", "username": "b" })));
        assert_eq!(preferred.username.as_deref(), Some("a"));
    }

    #[test]
    fn raw_claims_are_kept() {
        let raw = claims(json!({ "sub": 1, "tenant": "ori" }));
        assert_eq!(resolve_identity(raw.clone()).raw_claims, raw);
    }

    fn role_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("admin".to_string()),
            Just("director".to_string()),
            Just("coordinador".to_string()),
            "[a-z]{3,8}",
        ]
    }

    proptest! {
        /// Property: the resolved role equals the first source that yields one.
        #[test]
        fn precedence_follows_source_order(
            single in prop::option::of(role_name()),
            list in prop::option::of(prop::collection::vec(role_name(), 0..4)),
            scope in prop::option::of(prop::collection::vec(role_name(), 0..4)),
        ) {
            let mut map = serde_json::Map::new();
            if let Some(single) = &single {
                map.insert("role".into(), json!(single));
            }
            if let Some(list) = &list {
                map.insert("roles".into(), json!(list));
            }
            if let Some(scope) = &scope {
                map.insert("scope".into(), json!(scope.join(" ")));
            }

            let expected = single.iter().find_map(|r| r.parse::<Role>().ok())
                .or_else(|| list.iter().flatten().find_map(|r| r.parse::<Role>().ok()))
                .or_else(|| scope.iter().flatten().find_map(|r| r.parse::<Role>().ok()))
                .unwrap_or(Role::least_privileged());

            prop_assert_eq!(resolve_identity(Claims::new(map)).role, expected);
        }
    }
}
