//! Login/logout calls against the backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::failure_message;

/// Successful login body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: String,
    /// Username as confirmed by the backend.
    pub usuario: String,
    pub token: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend answered with a non-2xx status.
    #[error("backend rejected the request ({status})")]
    Rejected { status: u16, message: Option<String> },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Authentication endpoints. Single-shot calls: no retries, no timeouts.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, BackendError>;

    /// Invalidate server-side session state.
    async fn logout(&self, token: Option<&str>) -> Result<(), BackendError>;
}

/// `reqwest`-backed implementation of [`AuthBackend`].
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    http: reqwest::Client,
    api_url: String,
}

impl HttpAuthBackend {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    pub fn with_client(http: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/{}", self.api_url, path)
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, BackendError> {
        let form = reqwest::multipart::Form::new()
            .text("usuario", username.to_string())
            .text("password", password.to_string());

        let resp = self
            .http
            .post(self.url("login"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = failure_message(resp).await;
            tracing::debug!(status = status.as_u16(), ?message, "login rejected");
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<LoginResponse>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn logout(&self, token: Option<&str>) -> Result<(), BackendError> {
        let mut req = self.http.post(self.url("logout")).json(&serde_json::json!({}));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| BackendError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message: failure_message(resp).await,
            });
        }
        Ok(())
    }
}
