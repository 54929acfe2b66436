//! Async operations over an injected transport and token store.
//!
//! # Design
//! `ReminderSession` drives `ReminderClient` through one `Transport` round
//! trip per operation and never retries or caches a response. The store is
//! the only source of the token. Registration runs under a lock; callers
//! that queued behind an in-flight registration take its token, and every
//! later caller goes back to the store.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::{AcquireStep, ReminderClient};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::store::{StoreLookup, TokenStore};
use crate::transport::Transport;
use crate::types::{AuthToken, ProgressSummary, ReminderRecord, StreakInfo};

pub struct ReminderSession<T, S> {
    client: ReminderClient,
    transport: T,
    store: S,
    token_key: String,
    /// Completed registrations; bumped while `last_issued` is held.
    generation: AtomicU64,
    last_issued: Mutex<Option<AuthToken>>,
}

impl<T: Transport, S: TokenStore> ReminderSession<T, S> {
    pub fn new(config: &ClientConfig, transport: T, store: S) -> Self {
        Self {
            client: ReminderClient::new(&config.base_url),
            transport,
            store,
            token_key: config.token_key.clone(),
            generation: AtomicU64::new(0),
            last_issued: Mutex::new(None),
        }
    }

    pub fn client(&self) -> &ReminderClient {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Return the stored token, registering a synthetic test user if there
    /// is none. A failed store read counts as "none"; a failed store write
    /// is logged and the fresh token is still returned.
    pub async fn acquire_token(&self) -> Result<AuthToken, ApiError> {
        let seen = self.generation.load(Ordering::Acquire);
        if let StoreLookup::Found(token) = self.lookup().await {
            debug!("reusing stored auth token");
            return Ok(AuthToken::new(token));
        }

        let mut last_issued = self.last_issued.lock().await;
        if self.generation.load(Ordering::Acquire) != seen {
            // A registration finished while this call was waiting.
            if let Some(token) = last_issued.as_ref() {
                return Ok(token.clone());
            }
        }

        let request = match self.client.begin_acquire_token(self.lookup().await, Utc::now())? {
            AcquireStep::Ready(token) => return Ok(token),
            AcquireStep::Register(request) => request,
        };

        let response = self.send(request).await?;
        let token = self.client.parse_register(response)?;
        debug!("registered test user");

        if let Err(err) = self.store.set(&self.token_key, token.as_str()).await {
            warn!(key = %self.token_key, error = %err, "failed to persist auth token");
        }
        *last_issued = Some(token.clone());
        self.generation.fetch_add(1, Ordering::Release);
        Ok(token)
    }

    pub async fn fetch_todays_reminders(
        &self,
        token: &AuthToken,
    ) -> Result<Vec<ReminderRecord>, ApiError> {
        let response = self.send(self.client.build_todays_reminders(token)).await?;
        self.client.parse_todays_reminders(response)
    }

    pub async fn fetch_progress_summary(
        &self,
        token: &AuthToken,
    ) -> Result<ProgressSummary, ApiError> {
        let response = self.send(self.client.build_progress_summary(token)).await?;
        self.client.parse_progress_summary(response)
    }

    pub async fn fetch_streak(&self, token: &AuthToken) -> Result<StreakInfo, ApiError> {
        let response = self.send(self.client.build_streak(token)).await?;
        self.client.parse_streak(response)
    }

    async fn lookup(&self) -> StoreLookup {
        let lookup = StoreLookup::from(self.store.get(&self.token_key).await);
        if let StoreLookup::Failed(err) = &lookup {
            debug!(key = %self.token_key, error = %err, "token store read failed");
        }
        lookup
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), path = %request.path, "sending request");
        let response = self.transport.execute(request).await?;
        debug!(status = response.status, "received response");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::{StoreError, TransportError};
    use crate::http::HttpMethod;
    use crate::store::{MemoryTokenStore, TOKEN_KEY};

    /// Replays scripted responses and records every request it sees.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: StdMutex<VecDeque<Result<HttpResponse, TransportError>>>,
        requests: StdMutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn reply(self, status: u16, body: &str) -> Self {
            self.responses.lock().unwrap().push_back(Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            }));
            self
        }

        fn fail(self, err: TransportError) -> Self {
            self.responses.lock().unwrap().push_back(Err(err));
            self
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            tokio::task::yield_now().await;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request")
        }
    }

    /// Store whose reads and writes can be made to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryTokenStore,
        fail_get: AtomicBool,
        fail_set: AtomicBool,
    }

    #[async_trait]
    impl TokenStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            if self.fail_get.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("keychain locked".to_string()));
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.fail_set.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("disk full".to_string()));
            }
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new("http://backend.test").unwrap()
    }

    fn session<S: TokenStore>(
        transport: ScriptedTransport,
        store: S,
    ) -> ReminderSession<Arc<ScriptedTransport>, S> {
        ReminderSession::new(&config(), Arc::new(transport), store)
    }

    #[tokio::test]
    async fn stored_token_skips_network() {
        let s = session(ScriptedTransport::default(), MemoryTokenStore::with_entry(TOKEN_KEY, "stored"));
        let token = s.acquire_token().await.unwrap();
        assert_eq!(token.as_str(), "stored");
        assert!(s.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn empty_store_registers_and_persists() {
        let transport = ScriptedTransport::default().reply(201, r#"{"access_token":"T"}"#);
        let s = session(transport, MemoryTokenStore::new());

        let token = s.acquire_token().await.unwrap();
        assert_eq!(token.as_str(), "T");
        assert_eq!(s.store().get(TOKEN_KEY).await.unwrap().as_deref(), Some("T"));

        let requests = s.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].path, "http://backend.test/auth/email/register");
    }

    #[tokio::test]
    async fn store_read_failure_falls_through_to_registration() {
        let store = FlakyStore::default();
        store.fail_get.store(true, Ordering::SeqCst);
        let transport = ScriptedTransport::default().reply(200, r#"{"access_token":"fresh"}"#);
        let s = session(transport, store);

        assert_eq!(s.acquire_token().await.unwrap().as_str(), "fresh");
        assert_eq!(s.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn store_write_failure_is_not_fatal() {
        let store = FlakyStore::default();
        store.fail_set.store(true, Ordering::SeqCst);
        let transport = ScriptedTransport::default().reply(201, r#"{"access_token":"T"}"#);
        let s = session(transport, store);

        assert_eq!(s.acquire_token().await.unwrap().as_str(), "T");
        assert_eq!(s.store().get(TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn registration_conflict_is_reported() {
        let transport = ScriptedTransport::default().reply(409, "email taken");
        let s = session(transport, MemoryTokenStore::new());

        let err = s.acquire_token().await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("409") && msg.contains("email taken"), "{msg}");
        assert_eq!(s.store().get(TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_first_calls_register_once() {
        let transport = ScriptedTransport::default()
            .reply(201, r#"{"access_token":"first"}"#)
            .reply(201, r#"{"access_token":"second"}"#);
        let s = session(transport, MemoryTokenStore::new());

        let (a, b) = tokio::join!(s.acquire_token(), s.acquire_token());
        assert_eq!(a.unwrap().as_str(), "first");
        assert_eq!(b.unwrap().as_str(), "first");
        assert_eq!(s.transport.requests().len(), 1);
        assert_eq!(s.store().get(TOKEN_KEY).await.unwrap().as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn deleted_token_triggers_new_registration() {
        let transport = ScriptedTransport::default()
            .reply(201, r#"{"access_token":"first"}"#)
            .reply(201, r#"{"access_token":"second"}"#);
        let s = session(transport, MemoryTokenStore::new());

        assert_eq!(s.acquire_token().await.unwrap().as_str(), "first");
        s.store().delete(TOKEN_KEY).await.unwrap();

        assert_eq!(s.acquire_token().await.unwrap().as_str(), "second");
        assert_eq!(s.transport.requests().len(), 2);
        assert_eq!(s.store().get(TOKEN_KEY).await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn failed_write_shares_token_only_with_waiting_callers() {
        let transport = ScriptedTransport::default()
            .reply(201, r#"{"access_token":"first"}"#)
            .reply(201, r#"{"access_token":"second"}"#);
        let store = FlakyStore::default();
        store.fail_set.store(true, Ordering::SeqCst);
        let s = session(transport, store);

        let (a, b) = tokio::join!(s.acquire_token(), s.acquire_token());
        assert_eq!(a.unwrap().as_str(), "first");
        assert_eq!(b.unwrap().as_str(), "first");
        assert_eq!(s.transport.requests().len(), 1);

        // Nothing was persisted, so a later call registers again.
        assert_eq!(s.acquire_token().await.unwrap().as_str(), "second");
        assert_eq!(s.transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn fetch_streak_rejected_token() {
        let transport = ScriptedTransport::default().reply(401, "invalid token");
        let s = session(transport, MemoryTokenStore::new());

        let err = s.fetch_streak(&AuthToken::new("bad")).await.unwrap_err();
        assert!(matches!(err, ApiError::Fetch { status: 401, .. }));
        let msg = err.to_string();
        assert!(msg.contains("401") && msg.contains("invalid token"), "{msg}");

        let requests = s.transport.requests();
        assert_eq!(requests[0].header("authorization"), Some("Bearer bad"));
    }

    #[tokio::test]
    async fn fetch_todays_reminders_is_idempotent() {
        let body = json!([{"id": "r1", "medication": "Lisinopril", "taken": false}]).to_string();
        let transport = ScriptedTransport::default().reply(200, &body).reply(200, &body);
        let s = session(transport, MemoryTokenStore::new());
        let token = AuthToken::new("T");

        let first = s.fetch_todays_reminders(&token).await.unwrap();
        let second = s.fetch_todays_reminders(&token).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].field("medication"), Some(&json!("Lisinopril")));
    }

    #[tokio::test]
    async fn fetch_progress_summary_returns_body_unchanged() {
        let body = json!({"taken": 2, "total": 3, "adherence": 0.66});
        let transport = ScriptedTransport::default().reply(200, &body.to_string());
        let s = session(transport, MemoryTokenStore::new());

        let summary = s.fetch_progress_summary(&AuthToken::new("T")).await.unwrap();
        assert_eq!(summary.into_value(), body);
    }

    #[tokio::test]
    async fn transport_errors_propagate_unchanged() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let transport = ScriptedTransport::default().fail(TransportError::new(io));
        let s = session(transport, MemoryTokenStore::new());

        let err = s.fetch_streak(&AuthToken::new("T")).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.to_string(), "connection refused");
    }
}
