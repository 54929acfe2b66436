//! API client core for the DoseMate reminders backend.
//!
//! # Overview
//! `ReminderClient` builds `HttpRequest` values and parses `HttpResponse`
//! values without touching the network (host-does-IO pattern), so a native
//! mobile host can execute requests itself through the FFI crate.
//! `ReminderSession` layers the async operations on top, driving an injected
//! `Transport` and persisting the bearer token through an injected
//! `TokenStore`.
//!
//! # Design
//! - `ReminderClient` is stateless; it holds only `base_url`.
//! - Each operation is split into `build_*` and `parse_*`.
//! - Payloads (reminders, summary, streak) are permissive JSON wrappers; the
//!   backend owns their schema.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

pub use client::{AcquireStep, ReminderClient};
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, StoreError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::ReminderSession;
pub use store::{MemoryTokenStore, StoreLookup, TokenStore, TOKEN_KEY};
pub use transport::Transport;
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use types::{AuthToken, ProgressSummary, RegisterRequest, ReminderRecord, StreakInfo};
