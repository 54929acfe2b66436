use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub medication: String,
    pub dosage: String,
    pub scheduled_time: String,
    pub taken: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub taken: u32,
    pub total: u32,
    pub adherence_percent: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    pub current_days: u32,
    pub longest_days: u32,
}

#[derive(Deserialize)]
pub struct RegisterUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub access_token: String,
    pub user: RegisteredUser,
}

#[derive(Default)]
struct Db {
    emails: HashMap<String, Uuid>,
    tokens: HashMap<String, Uuid>,
    reminders: HashMap<Uuid, Vec<Reminder>>,
    streaks: HashMap<Uuid, Streak>,
    registrations: usize,
}

/// Shared in-memory backend state. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct AppState {
    db: Arc<RwLock<Db>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful registrations so far.
    pub async fn registrations(&self) -> usize {
        self.db.read().await.registrations
    }

    /// Replace a user's reminders, e.g. to mark doses as taken in tests.
    pub async fn set_reminders(&self, token: &str, reminders: Vec<Reminder>) -> bool {
        let mut db = self.db.write().await;
        let Some(user) = db.tokens.get(token).copied() else {
            return false;
        };
        db.reminders.insert(user, reminders);
        true
    }
}

pub fn app() -> Router {
    app_with_state(AppState::new())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/auth/email/register", post(register))
        .route("/reminders/today", get(todays_reminders))
        .route("/reminders/summary", get(summary))
        .route("/reminders/streak", get(streak))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn seed_reminders() -> Vec<Reminder> {
    [
        ("Metformin", "500 mg", "08:00", true),
        ("Lisinopril", "10 mg", "13:00", false),
        ("Atorvastatin", "20 mg", "21:00", false),
    ]
    .into_iter()
    .map(|(medication, dosage, time, taken)| Reminder {
        id: Uuid::new_v4(),
        medication: medication.to_string(),
        dosage: dosage.to_string(),
        scheduled_time: time.to_string(),
        taken,
    })
    .collect()
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterUser>,
) -> Result<(StatusCode, Json<RegisterResponse>), (StatusCode, &'static str)> {
    if !input.email.contains('@') {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "invalid email"));
    }
    if input.password.len() < 6 {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "password too short"));
    }

    let mut db = state.db.write().await;
    if db.emails.contains_key(&input.email) {
        return Err((StatusCode::CONFLICT, "email taken"));
    }

    let user = RegisteredUser {
        id: Uuid::new_v4(),
        email: input.email,
        name: input.name,
    };
    let token = Uuid::new_v4().simple().to_string();
    db.emails.insert(user.email.clone(), user.id);
    db.tokens.insert(token.clone(), user.id);
    db.reminders.insert(user.id, seed_reminders());
    db.streaks.insert(user.id, Streak { current_days: 0, longest_days: 0 });
    db.registrations += 1;
    info!(user = %user.id, "registered user");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            access_token: token,
            user,
        }),
    ))
}

/// A user resolved from the `Authorization: Bearer` header.
pub struct AuthUser(pub Uuid);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "missing token"))?;
        let db = state.db.read().await;
        db.tokens
            .get(token)
            .copied()
            .map(AuthUser)
            .ok_or((StatusCode::UNAUTHORIZED, "invalid token"))
    }
}

async fn todays_reminders(State(state): State<AppState>, AuthUser(user): AuthUser) -> Json<Vec<Reminder>> {
    debug!(%user, "today's reminders");
    let db = state.db.read().await;
    Json(db.reminders.get(&user).cloned().unwrap_or_default())
}

async fn summary(State(state): State<AppState>, AuthUser(user): AuthUser) -> Json<Summary> {
    debug!(%user, "progress summary");
    let db = state.db.read().await;
    let reminders = db.reminders.get(&user).map(Vec::as_slice).unwrap_or_default();
    Json(summarize(reminders))
}

async fn streak(State(state): State<AppState>, AuthUser(user): AuthUser) -> Json<Streak> {
    debug!(%user, "streak");
    let db = state.db.read().await;
    let streak = db.streaks.get(&user).cloned().unwrap_or(Streak {
        current_days: 0,
        longest_days: 0,
    });
    Json(streak)
}

pub fn summarize(reminders: &[Reminder]) -> Summary {
    let total = reminders.len() as u32;
    let taken = reminders.iter().filter(|r| r.taken).count() as u32;
    let adherence_percent = if total == 0 { 0 } else { taken * 100 / total };
    Summary {
        taken,
        total,
        adherence_percent,
    }
}
