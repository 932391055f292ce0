//! Test doubles shared by the unit tests.

use std::sync::Arc;

use ori_auth::{Claims, encode_unsigned};
use ori_core::SystemClock;

use crate::backend::{AuthBackend, BackendError, LoginResponse};
use crate::session::SessionStore;
use crate::storage::{MemoryStorage, TOKEN_KEY, TokenStorage};

/// Backend that is never reachable.
pub(crate) struct OfflineBackend;

#[async_trait::async_trait]
impl AuthBackend for OfflineBackend {
    async fn login(&self, _: &str, _: &str) -> Result<LoginResponse, BackendError> {
        Err(BackendError::Network("offline".into()))
    }

    async fn logout(&self, _: Option<&str>) -> Result<(), BackendError> {
        Err(BackendError::Network("offline".into()))
    }
}

/// Session whose storage holds an unsigned token with `claims`, or nothing.
pub(crate) fn session_with(claims: Option<serde_json::Value>) -> Arc<SessionStore> {
    let storage = Arc::new(MemoryStorage::new());
    if let Some(claims) = claims {
        let claims = Claims::try_from(claims).expect("claims must be an object");
        storage
            .set(TOKEN_KEY, &encode_unsigned(&claims))
            .expect("memory storage never fails");
    }
    Arc::new(SessionStore::new(storage, Arc::new(OfflineBackend), Arc::new(SystemClock)))
}
