//! Typed clients for the backend's REST resources.
//!
//! One [`ApiClient`] per base URL; resource handles ([`Users`],
//! [`Institutions`], [`Agreements`], [`Dashboard`], [`Notifications`],
//! [`Snies`], [`Uploads`]) borrow it. When a session is attached
//! its token is sent as a bearer credential.

mod agreements;
mod dashboard;
mod envelope;
mod institutions;
mod notifications;
mod snies;
mod uploads;
mod users;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::http::failure_message;
use crate::session::SessionStore;

pub use agreements::{Agreement, AgreementDraft, AgreementStatus, Agreements};
pub use dashboard::{
    AgreementRow, CountryRow, Dashboard, InstitutionRow, LabeledRow, Period, PeriodRow, PeriodTopCountry, ProgramRow,
};
pub use institutions::{Institution, Institutions};
pub use notifications::{AgreementNotice, ExpiryQuery, NOTICES_UNAVAILABLE, NoticeBoard, Notifications, Severity};
pub use snies::{Download, Snies};
pub use uploads::Uploads;
pub use users::{NewUser, User, UserStatus, UserUpdate, Users};

pub const DEFAULT_PAGE_LIMIT: u32 = 25;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("invalid api url '{0}'")]
    InvalidUrl(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("api returned {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status { status: u16, message: Option<String> },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub(crate) fn decode(err: impl core::fmt::Display) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Offset pagination sent as `?skip=&limit=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Page {
    pub fn new(skip: u32, limit: u32) -> Self {
        Self { skip, limit }
    }
}

/// One page of a listing plus the backend's total count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> ListPage<T> {
    /// Map every item of a list envelope with `item`.
    pub(crate) fn from_envelope(body: &Value, item: impl Fn(&Value) -> Result<T, ApiError>) -> Result<Self, ApiError> {
        let raw = envelope::extract_items(body);
        let total = envelope::extract_total(body, raw.len());
        let items = raw.iter().map(item).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { items, total })
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Option<Arc<SessionStore>>,
}

impl ApiClient {
    pub fn new(api_url: &str) -> Result<Self, ApiError> {
        Self::with_http_client(reqwest::Client::new(), api_url)
    }

    pub fn with_http_client(http: reqwest::Client, api_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(api_url.trim_end_matches('/')).map_err(|_| ApiError::InvalidUrl(api_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(api_url.to_string()));
        }
        Ok(Self {
            http,
            base_url,
            session: None,
        })
    }

    /// Attach a session whose token authenticates every request.
    pub fn with_session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn users(&self) -> Users<'_> {
        Users::new(self)
    }

    pub fn institutions(&self) -> Institutions<'_> {
        Institutions::new(self)
    }

    pub fn agreements(&self) -> Agreements<'_> {
        Agreements::new(self)
    }

    pub fn dashboard(&self) -> Dashboard<'_> {
        Dashboard::new(self)
    }

    pub fn notifications(&self) -> Notifications<'_> {
        Notifications::new(self)
    }

    pub fn snies(&self) -> Snies<'_> {
        Snies::new(self)
    }

    pub fn uploads(&self) -> Uploads<'_> {
        Uploads::new(self)
    }

    /// Base URL plus percent-encoded `segments`. A trailing `""` yields a trailing `/`.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let mut req = self.http.request(method, self.endpoint(segments));
        if let Some(token) = self.session.as_ref().and_then(|s| s.token()) {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Send and hand back a successful response unread.
    pub(crate) async fn send_raw(&self, req: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let resp = req.send().await.map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = failure_message(resp).await;
            tracing::warn!(status = status.as_u16(), message = message.as_deref().unwrap_or(""), "api request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    /// Send and read the body as JSON. An empty body reads as `null`.
    pub(crate) async fn send(&self, req: RequestBuilder) -> Result<Value, ApiError> {
        let resp = self.send_raw(req).await?;
        let body = resp.text().await.map_err(|e| ApiError::Network(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(ApiError::decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_segments() {
        let client = ApiClient::new("http://127.0.0.1:8888/api/").unwrap();
        assert_eq!(
            client.endpoint(&["convenios", "CV 01/2024"]).as_str(),
            "http://127.0.0.1:8888/api/convenios/CV%2001%2F2024"
        );
        assert_eq!(
            client.endpoint(&["instituciones", ""]).as_str(),
            "http://127.0.0.1:8888/api/instituciones/"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert_eq!(ApiClient::new("not a url").unwrap_err(), ApiError::InvalidUrl("not a url".into()));
        assert!(ApiClient::new("mailto:ori@example.org").is_err());
    }

    #[test]
    fn default_page() {
        assert_eq!(Page::default(), Page::new(0, 25));
    }

    #[test]
    fn status_error_shows_backend_message() {
        let err = ApiError::Status {
            status: 404,
            message: Some("Convenio no encontrado".into()),
        };
        assert_eq!(err.to_string(), "api returned 404: Convenio no encontrado");
    }
}
