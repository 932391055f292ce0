//! Login form flow: validation, submission and where to go next.

use serde::{Deserialize, Serialize};

use crate::navigation::{HOME_PATH, LOGIN_PATH};
use crate::session::{AuthError, SessionStore};

pub const MISSING_CREDENTIALS: &str = "Por favor, ingresa tus credenciales.";
pub const INVALID_CREDENTIALS: &str = "Credenciales inválidas";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Result of submitting the login form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum LoginOutcome {
    /// Signed in; navigate here.
    Navigate(String),
    /// Stay on the form and show this message.
    Rejected(String),
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }

    /// Submit the form. Blank credentials never reach the backend.
    pub async fn submit(&self, session: &SessionStore) -> LoginOutcome {
        if !self.is_complete() {
            return LoginOutcome::Rejected(MISSING_CREDENTIALS.to_string());
        }

        match session.login(self.username.trim(), &self.password).await {
            Ok(_) => LoginOutcome::Navigate(HOME_PATH.to_string()),
            Err(AuthError::AuthenticationFailed { message }) => {
                LoginOutcome::Rejected(message.unwrap_or_else(|| INVALID_CREDENTIALS.to_string()))
            }
            Err(err) => {
                tracing::warn!(error = %err, "login failed");
                LoginOutcome::Rejected(INVALID_CREDENTIALS.to_string())
            }
        }
    }
}

/// Sign out and return the path to show next, which is always the login page.
pub async fn logout_and_redirect(session: &SessionStore) -> String {
    if let Err(err) = session.logout().await {
        tracing::warn!(error = %err, "logout reported an error");
    }
    LOGIN_PATH.to_string()
}
