use serde::Serialize;
use thiserror::Error;

use crate::{Identity, Role, RoleRequirement, SubjectId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("no authenticated identity")]
    Unauthenticated,

    #[error("role '{role}' is not one of {required:?}")]
    MissingRole { role: Role, required: Vec<String> },
}

/// Check `identity` against `required`.
///
/// - No IO
/// - No panics
/// - An empty requirement allows everyone, including anonymous callers
pub fn authorize(identity: Option<&Identity>, required: &RoleRequirement) -> Result<(), AccessDenied> {
    if required.is_empty() {
        return Ok(());
    }

    let identity = identity.ok_or(AccessDenied::Unauthenticated)?;
    if required.allows(identity.role) {
        Ok(())
    } else {
        Err(AccessDenied::MissingRole {
            role: identity.role,
            required: required.to_vec(),
        })
    }
}

pub fn has_any_role(identity: Option<&Identity>, required: &RoleRequirement) -> bool {
    authorize(identity, required).is_ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Access explanation (diagnostics)
// ─────────────────────────────────────────────────────────────────────────────

/// Why an access decision came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessExplanation {
    pub required_roles: Vec<String>,
    pub granted: bool,
    pub reason: String,
    pub subject: Option<SubjectId>,
    pub current_role: Option<Role>,
    pub denial: Option<DenialKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Unauthenticated,
    MissingRole,
}

pub fn explain_access(identity: Option<&Identity>, required: &RoleRequirement) -> AccessExplanation {
    let required_roles = required.to_vec();
    let subject = identity.map(|i| i.id.clone());
    let current_role = identity.map(|i| i.role);

    let (granted, reason, denial) = match authorize(identity, required) {
        Ok(()) if required.is_empty() => (true, "no role restriction".to_string(), None),
        Ok(()) => (
            true,
            format!("role '{}' is listed in {:?}", current_role.map_or("", |r| r.as_str()), required_roles),
            None,
        ),
        Err(AccessDenied::Unauthenticated) => (
            false,
            format!("roles {required_roles:?} required but nobody is signed in"),
            Some(DenialKind::Unauthenticated),
        ),
        Err(AccessDenied::MissingRole { role, .. }) => (
            false,
            format!("role '{role}' is not listed in {required_roles:?}"),
            Some(DenialKind::MissingRole),
        ),
    };

    AccessExplanation {
        required_roles,
        granted,
        reason,
        subject,
        current_role,
        denial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Claims, resolve_identity};
    use serde_json::json;

    fn identity_with_role(role: &str) -> Identity {
        resolve_identity(Claims::try_from(json!({ "sub": 1, "role": role })).unwrap())
    }

    #[test]
    fn empty_requirement_allows_anonymous() {
        assert!(has_any_role(None, &RoleRequirement::none()));
        assert!(has_any_role(Some(&identity_with_role("director")), &RoleRequirement::none()));
    }

    #[test]
    fn anonymous_is_denied_when_roles_required() {
        assert_eq!(
            authorize(None, &RoleRequirement::new(["admin"])),
            Err(AccessDenied::Unauthenticated)
        );
    }

    #[test]
    fn role_match_is_case_insensitive() {
        let admin = identity_with_role("admin");
        let director = identity_with_role("director");

        assert!(has_any_role(Some(&admin), &RoleRequirement::new(["admin"])));
        assert!(has_any_role(Some(&admin), &RoleRequirement::new(["ADMIN"])));
        assert!(!has_any_role(Some(&director), &RoleRequirement::new(["admin"])));
        assert!(has_any_role(Some(&director), &RoleRequirement::new(["Admin", "DIRECTOR"])));
    }

    #[test]
    fn explanation_reports_missing_role() {
        let director = identity_with_role("director");
        let explanation = explain_access(Some(&director), &RoleRequirement::new(["admin"]));

        assert!(!explanation.granted);
        assert_eq!(explanation.denial, Some(DenialKind::MissingRole));
        assert_eq!(explanation.current_role, Some(Role::Director));
        assert_eq!(explanation.subject, Some(SubjectId::Number(1)));
        assert!(explanation.reason.contains("director"));
    }

    #[test]
    fn explanation_for_open_access() {
        let explanation = explain_access(None, &RoleRequirement::none());
        assert!(explanation.granted);
        assert_eq!(explanation.denial, None);
        assert_eq!(explanation.reason, "no role restriction");
    }
}
