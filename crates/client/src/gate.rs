//! Role checks against the current session.

use std::sync::Arc;

use ori_auth::{AccessDenied, AccessExplanation, RoleRequirement, authorize, explain_access};

use crate::session::SessionStore;

/// Answers "may the current user see/do this?".
///
/// Reads the session through [`SessionStore::current_identity`]; that lazy
/// hydration is its only side effect.
#[derive(Debug, Clone)]
pub struct AccessGate {
    session: Arc<SessionStore>,
}

impl AccessGate {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    pub fn authorize(&self, required: &RoleRequirement) -> Result<(), AccessDenied> {
        if required.is_empty() {
            return Ok(());
        }
        let identity = self.session.current_identity();
        authorize(identity.as_deref(), required)
    }

    pub fn has_any_role(&self, required: &RoleRequirement) -> bool {
        self.authorize(required).is_ok()
    }

    pub fn explain(&self, required: &RoleRequirement) -> AccessExplanation {
        let identity = self.session.current_identity();
        explain_access(identity.as_deref(), required)
    }

    /// Keep `fragment` only if the current user holds one of `required`.
    pub fn render_if<T>(&self, required: &RoleRequirement, fragment: T) -> Option<T> {
        self.has_any_role(required).then_some(fragment)
    }

    /// Lazily build a fragment only when it will be shown.
    pub fn render_with<T>(&self, required: &RoleRequirement, build: impl FnOnce() -> T) -> Option<T> {
        self.has_any_role(required).then(build)
    }
}
