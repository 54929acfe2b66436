//! Stateless HTTP request builder and response parser for the reminders API.
//!
//! # Design
//! `ReminderClient` holds only a `base_url`. Each operation is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method that
//! consumes an `HttpResponse`. The caller executes the round trip, so the
//! core stays deterministic and free of I/O.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::store::StoreLookup;
use crate::types::{
    AuthToken, ProgressSummary, RegisterRequest, RegisterResponse, ReminderRecord, StreakInfo,
};

pub const REGISTER_PATH: &str = "/auth/email/register";
pub const TODAY_PATH: &str = "/reminders/today";
pub const SUMMARY_PATH: &str = "/reminders/summary";
pub const STREAK_PATH: &str = "/reminders/streak";

/// What `acquire_token` has to do next.
#[derive(Debug)]
pub enum AcquireStep {
    /// A stored token exists; no request is needed.
    Ready(AuthToken),
    /// No usable token; execute this registration request and feed the
    /// response to `parse_register`.
    Register(HttpRequest),
}

/// Synchronous, stateless client for the reminders API.
#[derive(Debug, Clone)]
pub struct ReminderClient {
    base_url: String,
}

impl ReminderClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Decide between reusing a stored token and registering. A failed store
    /// read is treated like an empty store.
    pub fn begin_acquire_token(
        &self,
        lookup: StoreLookup,
        now: DateTime<Utc>,
    ) -> Result<AcquireStep, ApiError> {
        match lookup {
            StoreLookup::Found(token) => Ok(AcquireStep::Ready(AuthToken::new(token))),
            StoreLookup::NotFound | StoreLookup::Failed(_) => {
                let req = self.build_register(&RegisterRequest::synthetic(now))?;
                Ok(AcquireStep::Register(req))
            }
        }
    }

    pub fn build_register(&self, input: &RegisterRequest) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}{REGISTER_PATH}", self.base_url),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("accept".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        })
    }

    pub fn build_todays_reminders(&self, token: &AuthToken) -> HttpRequest {
        self.authorized_get(TODAY_PATH, token)
    }

    pub fn build_progress_summary(&self, token: &AuthToken) -> HttpRequest {
        self.authorized_get(SUMMARY_PATH, token)
    }

    pub fn build_streak(&self, token: &AuthToken) -> HttpRequest {
        self.authorized_get(STREAK_PATH, token)
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<AuthToken, ApiError> {
        if !response.is_success() {
            return Err(ApiError::Registration {
                status: response.status,
                body: response.body,
            });
        }
        let parsed: RegisterResponse = decode(&response.body)?;
        Ok(AuthToken::new(parsed.access_token))
    }

    pub fn parse_todays_reminders(&self, response: HttpResponse) -> Result<Vec<ReminderRecord>, ApiError> {
        check_fetch(&response)?;
        decode(&response.body)
    }

    pub fn parse_progress_summary(&self, response: HttpResponse) -> Result<ProgressSummary, ApiError> {
        check_fetch(&response)?;
        decode(&response.body)
    }

    pub fn parse_streak(&self, response: HttpResponse) -> Result<StreakInfo, ApiError> {
        check_fetch(&response)?;
        decode(&response.body)
    }

    fn authorized_get(&self, path: &str, token: &AuthToken) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}{path}", self.base_url),
            headers: vec![
                ("authorization".to_string(), token.bearer()),
                ("accept".to_string(), "application/json".to_string()),
            ],
            body: None,
        }
    }
}

/// Map a non-2xx read response to `ApiError::Fetch`.
fn check_fetch(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Fetch {
        status: response.status,
        body: response.body.clone(),
    })
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use chrono::TimeZone;
    use serde_json::json;

    fn client() -> ReminderClient {
        ReminderClient::new("http://localhost:3000")
    }

    fn token() -> AuthToken {
        AuthToken::new("tok-123")
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_register_produces_json_post() {
        let input = RegisterRequest {
            email: "a@example.com".to_string(),
            name: "A".to_string(),
            password: "pw".to_string(),
        };
        let req = client().build_register(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/auth/email/register");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.header("authorization").is_none());
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"email": "a@example.com", "name": "A", "password": "pw"}));
    }

    #[test]
    fn read_requests_carry_bearer_token() {
        let c = client();
        let cases = [
            (c.build_todays_reminders(&token()), "http://localhost:3000/reminders/today"),
            (c.build_progress_summary(&token()), "http://localhost:3000/reminders/summary"),
            (c.build_streak(&token()), "http://localhost:3000/reminders/streak"),
        ];
        for (req, path) in cases {
            assert_eq!(req.method, HttpMethod::Get);
            assert_eq!(req.path, path);
            assert_eq!(req.header("authorization"), Some("Bearer tok-123"));
            assert!(req.body.is_none());
        }
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = ReminderClient::new("http://localhost:3000/");
        assert_eq!(client.build_streak(&token()).path, "http://localhost:3000/reminders/streak");
    }

    #[test]
    fn begin_acquire_reuses_stored_token() {
        let step = client()
            .begin_acquire_token(StoreLookup::Found("stored".to_string()), Utc::now())
            .unwrap();
        assert!(matches!(step, AcquireStep::Ready(t) if t.as_str() == "stored"));
    }

    #[test]
    fn begin_acquire_registers_when_store_empty_or_broken() {
        let now = Utc.timestamp_millis_opt(42).unwrap();
        let lookups = [
            StoreLookup::NotFound,
            StoreLookup::Failed(StoreError::Unavailable("keychain locked".to_string())),
        ];
        for lookup in lookups {
            match client().begin_acquire_token(lookup, now).unwrap() {
                AcquireStep::Register(req) => {
                    assert_eq!(req.path, "http://localhost:3000/auth/email/register");
                    let body: serde_json::Value =
                        serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
                    assert_eq!(body["email"], "dosemate.test+42@example.com");
                }
                AcquireStep::Ready(_) => panic!("expected registration"),
            }
        }
    }

    #[test]
    fn parse_register_extracts_token() {
        let token = client()
            .parse_register(response(201, r#"{"access_token":"T"}"#))
            .unwrap();
        assert_eq!(token.as_str(), "T");
    }

    #[test]
    fn parse_register_conflict() {
        let err = client().parse_register(response(409, "email taken")).unwrap_err();
        assert!(matches!(err, ApiError::Registration { status: 409, .. }));
        let msg = err.to_string();
        assert!(msg.contains("409") && msg.contains("email taken"));
    }

    #[test]
    fn parse_register_missing_token_field() {
        let err = client().parse_register(response(200, r#"{"token":"T"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn parse_todays_reminders_returns_body_unchanged() {
        let body = json!([
            {"id": "r1", "medication": "Metformin", "dosage": "500mg", "taken": false},
            {"id": "r2", "extra": {"nested": [1, 2]}}
        ]);
        let records = client()
            .parse_todays_reminders(response(200, &body.to_string()))
            .unwrap();
        assert_eq!(serde_json::to_value(&records).unwrap(), body);
    }

    #[test]
    fn parse_todays_reminders_requires_array() {
        let err = client()
            .parse_todays_reminders(response(200, r#"{"id":"r1"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn fetch_errors_carry_status_and_body() {
        for (status, body) in [(401, "invalid token"), (403, "forbidden"), (500, "boom")] {
            let err = client().parse_streak(response(status, body)).unwrap_err();
            assert!(matches!(err, ApiError::Fetch { .. }));
            let msg = err.to_string();
            assert!(msg.contains(&status.to_string()), "{msg}");
            assert!(msg.contains(body), "{msg}");
        }
    }

    #[test]
    fn parse_progress_summary_success() {
        let summary = client()
            .parse_progress_summary(response(200, r#"{"taken":3,"total":4}"#))
            .unwrap();
        assert_eq!(summary.field("taken"), Some(&json!(3)));
    }

    #[test]
    fn parse_bad_json() {
        let err = client().parse_streak(response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }
}
