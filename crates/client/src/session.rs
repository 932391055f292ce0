//! Session store: the single owner of "who is signed in".
//!
//! The raw token lives in [`TokenStorage`]; the decoded identity is cached
//! here. Share the store as `Arc<SessionStore>` with whatever needs it
//! (gate, guards, API client).

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use ori_auth::{Claims, Identity, decode_token, resolve_identity};
use ori_core::Clock;

use crate::backend::{AuthBackend, BackendError};
use crate::storage::{StorageError, TOKEN_KEY, TokenStorage, USERNAME_KEY};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication failed{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    AuthenticationFailed { message: Option<String> },

    #[error("backend issued a malformed token")]
    MalformedToken,

    #[error("network error: {0}")]
    Network(String),

    /// The backend refused or failed the logout call. Local state is already cleared.
    #[error("logout failed: {0}")]
    LogoutFailed(#[source] BackendError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<BackendError> for AuthError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Rejected { message, .. } => AuthError::AuthenticationFailed { message },
            BackendError::Network(msg) => AuthError::Network(msg),
            BackendError::Decode(msg) => AuthError::Network(format!("unexpected response: {msg}")),
        }
    }
}

/// State of the persisted token, as seen right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Nothing persisted.
    Anonymous,
    /// A decodable token that has not expired.
    Active,
    /// A decodable token at or past its `exp`.
    Expired,
    /// A persisted token that cannot be decoded.
    Malformed,
}

enum Persisted {
    Nothing,
    Valid(Claims),
    Expired,
    Malformed,
}

pub struct SessionStore {
    storage: Arc<dyn TokenStorage>,
    backend: Arc<dyn AuthBackend>,
    clock: Arc<dyn Clock>,
    current: Mutex<Option<Arc<Identity>>>,
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStore")
            .field("current", &*self.lock_current())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Build an empty store. Call [`initialize`](Self::initialize) to hydrate
    /// from storage.
    pub fn new(storage: Arc<dyn TokenStorage>, backend: Arc<dyn AuthBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            backend,
            clock,
            current: Mutex::new(None),
        }
    }

    /// Hydrate from persisted storage.
    ///
    /// A malformed or expired token is purged and the session stays empty;
    /// nothing is reported to the caller.
    pub fn initialize(&self) {
        let mut current = self.lock_current();
        *current = None;

        match self.load() {
            Persisted::Nothing => tracing::debug!("no persisted session"),
            Persisted::Valid(claims) => {
                let identity = resolve_identity(claims);
                tracing::info!(subject = %identity.id, role = %identity.role, "session restored");
                *current = Some(Arc::new(identity));
            }
            Persisted::Expired | Persisted::Malformed => {
                tracing::info!("persisted session is no longer valid; purging");
                self.clear_storage();
            }
        }
    }

    /// Authenticate against the backend and make the result current.
    ///
    /// Nothing is persisted unless the backend accepts the credentials and
    /// returns a decodable token.
    pub async fn login(&self, username: &str, password: &str) -> Result<Arc<Identity>, AuthError> {
        let response = self.backend.login(username, password).await?;

        let claims = decode_token(&response.token).map_err(|_| AuthError::MalformedToken)?;
        let identity = Arc::new(resolve_identity(claims));

        let mut current = self.lock_current();
        if let Err(e) = self.persist(&response.token, &response.usuario) {
            // Both entries or neither.
            self.clear_storage();
            *current = None;
            return Err(e.into());
        }
        *current = Some(Arc::clone(&identity));

        tracing::info!(username = %response.usuario, subject = %identity.id, role = %identity.role, "signed in");
        Ok(identity)
    }

    /// Sign out. Local state is always cleared, whatever the backend says;
    /// a backend failure is still returned so it can be shown.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let token = self.token();
        let remote = self.backend.logout(token.as_deref()).await;

        self.purge();
        tracing::info!("signed out");

        remote.map_err(|e| {
            tracing::warn!(error = %e, "backend logout failed; local session cleared anyway");
            AuthError::LogoutFailed(e)
        })
    }

    /// The signed-in identity, if any.
    ///
    /// Returns the cached value when present; otherwise decodes a persisted,
    /// unexpired token and caches it. Never fails.
    pub fn current_identity(&self) -> Option<Arc<Identity>> {
        let mut current = self.lock_current();
        if let Some(identity) = current.as_ref() {
            return Some(Arc::clone(identity));
        }

        match self.load() {
            Persisted::Valid(claims) => {
                let identity = Arc::new(resolve_identity(claims));
                tracing::debug!(subject = %identity.id, "identity hydrated from persisted token");
                *current = Some(Arc::clone(&identity));
                Some(identity)
            }
            Persisted::Nothing | Persisted::Expired | Persisted::Malformed => None,
        }
    }

    /// Inspect the persisted token without touching any state.
    pub fn status(&self) -> SessionStatus {
        match self.load() {
            Persisted::Nothing => SessionStatus::Anonymous,
            Persisted::Valid(_) => SessionStatus::Active,
            Persisted::Expired => SessionStatus::Expired,
            Persisted::Malformed => SessionStatus::Malformed,
        }
    }

    /// Drop the persisted entries and the cached identity.
    pub fn purge(&self) {
        let mut current = self.lock_current();
        self.clear_storage();
        *current = None;
    }

    /// `true` iff a persisted token exists and has not expired.
    ///
    /// Side effect: an expired (or undecodable) token is purged together with
    /// the cached identity. This is [`status`](Self::status) followed by
    /// [`purge`](Self::purge) when needed.
    pub fn is_authenticated(&self) -> bool {
        // Held across check and purge so a concurrent login is never wiped.
        let mut current = self.lock_current();
        match self.status() {
            SessionStatus::Active => true,
            SessionStatus::Anonymous => false,
            status @ (SessionStatus::Expired | SessionStatus::Malformed) => {
                tracing::info!(?status, "session expired; purging");
                self.clear_storage();
                *current = None;
                false
            }
        }
    }

    /// Raw persisted token (for bearer authentication).
    pub fn token(&self) -> Option<String> {
        self.read_entry(TOKEN_KEY)
    }

    /// Username confirmed by the backend at login.
    pub fn stored_username(&self) -> Option<String> {
        self.read_entry(USERNAME_KEY)
    }

    fn load(&self) -> Persisted {
        let Some(token) = self.token() else {
            return Persisted::Nothing;
        };

        match decode_token(&token) {
            Ok(claims) if claims.is_expired_at(self.clock.now_secs()) => Persisted::Expired,
            Ok(claims) => Persisted::Valid(claims),
            Err(_) => Persisted::Malformed,
        }
    }

    fn persist(&self, token: &str, username: &str) -> Result<(), StorageError> {
        self.storage.set(TOKEN_KEY, token)?;
        self.storage.set(USERNAME_KEY, username)
    }

    fn read_entry(&self, key: &str) -> Option<String> {
        self.storage.get(key).unwrap_or_else(|e| {
            tracing::warn!(error = %e, key, "failed to read session storage");
            None
        })
    }

    fn clear_storage(&self) {
        if let Err(e) = self.storage.remove_all(&[TOKEN_KEY, USERNAME_KEY]) {
            tracing::warn!(error = %e, "failed to purge session storage");
        }
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<Arc<Identity>>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use ori_auth::{Role, SubjectId, encode_unsigned};
    use ori_core::FixedClock;

    use super::*;
    use crate::backend::LoginResponse;
    use crate::storage::MemoryStorage;

    const NOW: i64 = 1_700_000_000;

    /// Backend double: accepts one credential pair, optionally fails logout.
    struct FakeBackend {
        token: String,
        logout_error: Option<BackendError>,
        logout_calls: AtomicUsize,
    }

    impl FakeBackend {
        fn issuing(token: String) -> Self {
            Self {
                token,
                logout_error: None,
                logout_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl AuthBackend for FakeBackend {
        async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, BackendError> {
            if username == "mlopez" && password == "secreto" {
                Ok(LoginResponse {
                    message: "ok".into(),
                    usuario: username.into(),
                    token: self.token.clone(),
                })
            } else {
                Err(BackendError::Rejected {
                    status: 401,
                    message: Some("Usuario o contraseña incorrectos".into()),
                })
            }
        }

        async fn logout(&self, _token: Option<&str>) -> Result<(), BackendError> {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);
            match &self.logout_error {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    fn token(claims: serde_json::Value) -> String {
        encode_unsigned(&Claims::try_from(claims).unwrap())
    }

    fn store_with(storage: Arc<MemoryStorage>, backend: FakeBackend) -> SessionStore {
        SessionStore::new(storage, Arc::new(backend), Arc::new(FixedClock::at_secs(NOW)))
    }

    fn store_with_storage(storage: Arc<FlakyStorage>, backend: FakeBackend) -> SessionStore {
        SessionStore::new(storage, Arc::new(backend), Arc::new(FixedClock::at_secs(NOW)))
    }

    fn persisted(claims: serde_json::Value) -> Arc<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, &token(claims)).unwrap();
        storage.set(USERNAME_KEY, "mlopez").unwrap();
        storage
    }

    #[test]
    fn initialize_without_token_is_anonymous() {
        let session = store_with(Arc::new(MemoryStorage::new()), FakeBackend::issuing(String::new()));
        session.initialize();

        assert_eq!(session.status(), SessionStatus::Anonymous);
        assert!(session.current_identity().is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn initialize_restores_valid_token() {
        let storage = persisted(json!({ "sub": 5, "role": "director", "exp": NOW + 60 }));
        let session = store_with(storage, FakeBackend::issuing(String::new()));
        session.initialize();

        let identity = session.current_identity().unwrap();
        assert_eq!(identity.id, SubjectId::Number(5));
        assert_eq!(identity.role, Role::Director);
    }

    #[test]
    fn initialize_purges_expired_token() {
        let storage = persisted(json!({ "sub": 5, "exp": NOW }));
        let session = store_with(Arc::clone(&storage), FakeBackend::issuing(String::new()));
        session.initialize();

        assert!(session.current_identity().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn initialize_purges_malformed_token() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "not-a-token").unwrap();
        storage.set(USERNAME_KEY, "mlopez").unwrap();

        let session = store_with(Arc::clone(&storage), FakeBackend::issuing(String::new()));
        session.initialize();

        assert!(storage.is_empty());
        assert!(session.current_identity().is_none());
    }

    #[test]
    fn expired_token_fails_authentication_and_empties_storage() {
        let storage = persisted(json!({ "sub": 5, "exp": NOW - 1 }));
        let session = store_with(Arc::clone(&storage), FakeBackend::issuing(String::new()));

        assert!(!session.is_authenticated());
        assert!(storage.is_empty());
        assert_eq!(session.status(), SessionStatus::Anonymous);
    }

    #[test]
    fn missing_exp_is_never_expired() {
        let storage = persisted(json!({ "sub": 5 }));
        let session = store_with(storage, FakeBackend::issuing(String::new()));
        assert!(session.is_authenticated());
    }

    #[test]
    fn status_alone_does_not_purge() {
        let storage = persisted(json!({ "sub": 5, "exp": NOW - 10 }));
        let session = store_with(Arc::clone(&storage), FakeBackend::issuing(String::new()));

        assert_eq!(session.status(), SessionStatus::Expired);
        assert!(!storage.is_empty());

        // The composed check is the one that cleans up.
        assert!(!session.is_authenticated());
        assert!(storage.is_empty());
    }

    #[test]
    fn is_authenticated_drops_cached_identity_on_expiry() {
        let storage = persisted(json!({ "sub": 5, "exp": NOW + 30 }));
        let clock = Arc::new(FixedClock::at_secs(NOW));
        let session = SessionStore::new(
            Arc::clone(&storage) as Arc<dyn TokenStorage>,
            Arc::new(FakeBackend::issuing(String::new())),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        assert!(session.current_identity().is_some());

        clock.advance(chrono::Duration::seconds(30));
        assert!(!session.is_authenticated());
        assert!(session.current_identity().is_none());
    }

    #[test]
    fn current_identity_is_cached() {
        let storage = persisted(json!({ "sub": 5, "role": "admin" }));
        let session = store_with(Arc::clone(&storage), FakeBackend::issuing(String::new()));

        let first = session.current_identity().unwrap();
        // Replacing the persisted token does not re-trigger decoding.
        storage.set(TOKEN_KEY, &token(json!({ "sub": 6 }))).unwrap();
        let second = session.current_identity().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.id, SubjectId::Number(5));
    }

    #[tokio::test]
    async fn login_persists_token_and_username() {
        let issued = token(json!({ "sub": 11, "roles": ["admin"], "exp": NOW + 3600 }));
        let storage = Arc::new(MemoryStorage::new());
        let session = store_with(Arc::clone(&storage), FakeBackend::issuing(issued.clone()));

        let identity = session.login("mlopez", "secreto").await.unwrap();
        assert_eq!(identity.id, SubjectId::Number(11));
        assert_eq!(identity.role, Role::Admin);

        assert_eq!(storage.get(TOKEN_KEY).unwrap(), Some(issued));
        assert_eq!(session.stored_username().as_deref(), Some("mlopez"));
        assert!(Arc::ptr_eq(&identity, &session.current_identity().unwrap()));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn rejected_login_leaves_storage_untouched() {
        let storage = Arc::new(MemoryStorage::new());
        let session = store_with(Arc::clone(&storage), FakeBackend::issuing(token(json!({ "sub": 1 }))));

        let err = session.login("mlopez", "wrong").await.unwrap_err();
        match err {
            AuthError::AuthenticationFailed { message } => {
                assert_eq!(message.as_deref(), Some("Usuario o contraseña incorrectos"));
            }
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }
        assert!(storage.is_empty());
        assert!(session.current_identity().is_none());
    }

    #[tokio::test]
    async fn malformed_issued_token_is_not_persisted() {
        let storage = Arc::new(MemoryStorage::new());
        let session = store_with(Arc::clone(&storage), FakeBackend::issuing("garbage".into()));

        assert!(matches!(session.login("mlopez", "secreto").await, Err(AuthError::MalformedToken)));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn logout_clears_local_state_even_when_backend_fails() {
        let storage = persisted(json!({ "sub": 5, "role": "admin" }));
        let backend = FakeBackend {
            logout_error: Some(BackendError::Network("connection refused".into())),
            ..FakeBackend::issuing(String::new())
        };
        let session = store_with(Arc::clone(&storage), backend);
        assert!(session.current_identity().is_some());

        let result = session.logout().await;

        assert!(matches!(result, Err(AuthError::LogoutFailed(BackendError::Network(_)))));
        assert!(!session.is_authenticated());
        assert!(session.current_identity().is_none());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn logout_calls_backend_once() {
        let storage = persisted(json!({ "sub": 5 }));
        let backend = Arc::new(FakeBackend::issuing(String::new()));
        let session = SessionStore::new(
            storage,
            Arc::clone(&backend) as Arc<dyn AuthBackend>,
            Arc::new(FixedClock::at_secs(NOW)),
        );

        session.logout().await.unwrap();
        assert_eq!(backend.logout_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.status(), SessionStatus::Anonymous);
    }

    #[tokio::test]
    async fn rejected_logout_is_not_reported_as_failed_authentication() {
        let storage = persisted(json!({ "sub": 5, "role": "admin" }));
        let backend = FakeBackend {
            logout_error: Some(BackendError::Rejected {
                status: 500,
                message: Some("boom".into()),
            }),
            ..FakeBackend::issuing(String::new())
        };
        let session = store_with(Arc::clone(&storage), backend);

        let err = session.logout().await.unwrap_err();

        assert!(matches!(err, AuthError::LogoutFailed(BackendError::Rejected { status: 500, .. })));
        assert_eq!(err.to_string(), "logout failed: backend rejected the request (500)");
        assert!(storage.is_empty());
    }

    /// Memory storage that can fail writes to one key and run a hook on the
    /// next token read (after the value has been read).
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        fail_set_on: Option<&'static str>,
        on_token_read: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl TokenStorage for FlakyStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            let value = self.inner.get(key);
            if key == TOKEN_KEY {
                let hook = self.on_token_read.lock().unwrap().take();
                if let Some(hook) = hook {
                    hook();
                }
            }
            value
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_set_on == Some(key) {
                return Err(StorageError::Io {
                    path: "session.json".into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[tokio::test]
    async fn failed_username_write_leaves_no_session_behind() {
        let issued = token(json!({ "sub": 11, "role": "admin", "exp": NOW + 3600 }));
        let storage = Arc::new(FlakyStorage {
            fail_set_on: Some(USERNAME_KEY),
            ..FlakyStorage::default()
        });
        let session = store_with_storage(Arc::clone(&storage), FakeBackend::issuing(issued));

        let err = session.login("mlopez", "secreto").await.unwrap_err();

        assert!(matches!(err, AuthError::Storage(StorageError::Io { .. })));
        assert!(session.token().is_none());
        assert!(session.stored_username().is_none());
        assert!(session.current_identity().is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn expiry_purge_does_not_wipe_a_concurrent_login() {
        let fresh = token(json!({ "sub": 11, "role": "admin", "exp": NOW + 3600 }));
        let storage = Arc::new(FlakyStorage::default());
        storage
            .set(TOKEN_KEY, &token(json!({ "sub": 5, "exp": NOW - 10 })))
            .unwrap();
        let session = Arc::new(store_with_storage(
            Arc::clone(&storage),
            FakeBackend::issuing(fresh.clone()),
        ));

        // Once the expired token has been read, a login starts on another
        // thread and gets a short head start before the purge runs.
        let login_thread = Arc::new(Mutex::new(None));
        {
            let session = Arc::clone(&session);
            let login_thread = Arc::clone(&login_thread);
            *storage.on_token_read.lock().unwrap() = Some(Box::new(move || {
                let (done_tx, done_rx) = std::sync::mpsc::channel();
                let handle = std::thread::spawn(move || {
                    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
                    let result = runtime.block_on(session.login("mlopez", "secreto"));
                    let _ = done_tx.send(());
                    result.is_ok()
                });
                let _ = done_rx.recv_timeout(std::time::Duration::from_millis(100));
                *login_thread.lock().unwrap() = Some(handle);
            }));
        }

        assert!(!session.is_authenticated());

        let handle = login_thread.lock().unwrap().take().unwrap();
        assert!(handle.join().unwrap());
        assert_eq!(session.token(), Some(fresh));
        assert!(session.is_authenticated());
    }
}
