//! Domain DTOs for the reminders API.
//!
//! # Design
//! The backend owns the schema of reminders, summaries and streaks. The
//! client wraps each payload as a transparent JSON value: unknown fields
//! survive untouched and nothing is validated beyond "it is JSON". Only the
//! registration exchange has a fixed shape.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Display name sent with every synthetic registration.
pub const TEST_USER_NAME: &str = "DoseMate Test User";

/// Password sent with every synthetic registration.
pub const TEST_USER_PASSWORD: &str = "dosemate-test-password";

/// Bearer credentials issued by the backend.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Value for the `authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Request payload for `POST /auth/email/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl RegisterRequest {
    /// A throwaway test account whose email is unique per millisecond.
    pub fn synthetic(now: DateTime<Utc>) -> Self {
        Self {
            email: format!("dosemate.test+{}@example.com", now.timestamp_millis()),
            name: TEST_USER_NAME.to_string(),
            password: TEST_USER_PASSWORD.to_string(),
        }
    }

    pub fn synthetic_now() -> Self {
        Self::synthetic(Utc::now())
    }
}

/// Successful registration body. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub access_token: String,
}

macro_rules! json_payload {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Value);

        impl $name {
            pub fn as_value(&self) -> &Value {
                &self.0
            }

            pub fn into_value(self) -> Value {
                self.0
            }

            /// Top-level field lookup; `None` if absent or not an object.
            pub fn field(&self, key: &str) -> Option<&Value> {
                self.0.get(key)
            }
        }

        impl From<Value> for $name {
            fn from(value: Value) -> Self {
                Self(value)
            }
        }
    };
}

json_payload!(
    /// One entry of `GET /reminders/today`.
    ReminderRecord
);

json_payload!(
    /// Body of `GET /reminders/summary`.
    ProgressSummary
);

json_payload!(
    /// Body of `GET /reminders/streak`.
    StreakInfo
);
