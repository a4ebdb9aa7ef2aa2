use std::collections::HashMap;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use draw_core::{
    assignment_rows, build_notices, normalize_email, solve_with, verify_assignment, Assignment,
    AssignmentRow, DrawMeta, Exclusion, ExclusionInput, Notice, Participant, ParticipantInput,
    Roster, SolverConfig,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

pub mod config;
pub mod error;

use config::Config;
use error::ApiError;

const CODE_LEN: usize = 8;

#[derive(Clone)]
pub struct AppState {
    draws: Arc<RwLock<HashMap<String, DrawRecord>>>,
    persist_path: Option<PathBuf>,
    solver: SolverConfig,
    public_url: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory(&Config::default())
    }
}

impl AppState {
    fn in_memory(config: &Config) -> Self {
        Self {
            draws: Arc::new(RwLock::new(HashMap::new())),
            persist_path: None,
            solver: config.solver,
            public_url: config.public_url.clone(),
        }
    }

    /// Builds the state and, when a snapshot path is configured, loads the
    /// draws saved there.
    pub async fn from_config(config: &Config) -> Self {
        let mut state = Self::in_memory(config);
        if let Some(path) = &config.persist_path {
            state.persist_path = Some(path.clone());
            state.load(path).await;
        }
        state
    }

    pub async fn with_persistence(path: impl Into<PathBuf>) -> Self {
        let config = Config {
            persist_path: Some(path.into()),
            ..Config::default()
        };
        Self::from_config(&config).await
    }

    async fn load(&self, path: &FsPath) {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                info!("no snapshot loaded from {}: {err}", path.display());
                return;
            }
        };
        match serde_json::from_slice::<HashMap<String, DrawRecord>>(&bytes) {
            Ok(saved) => {
                info!("loaded {} draws from {}", saved.len(), path.display());
                *self.draws.write().await = saved;
            }
            Err(err) => warn!("ignoring unreadable snapshot {}: {err}", path.display()),
        }
    }

    async fn persist(&self) {
        if let Some(path) = &self.persist_path {
            let snapshot = {
                let draws = self.draws.read().await;
                draws.clone()
            };
            match serde_json::to_vec_pretty(&snapshot) {
                Ok(json) => {
                    if let Err(err) = tokio::fs::write(path, json).await {
                        error!("persist error: {err}");
                    }
                }
                Err(err) => error!("snapshot encode error: {err}"),
            }
        }
    }

    fn draw_link(&self, code: &str) -> String {
        format!("{}/draw/{code}", self.public_url)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrawRecord {
    pub id: String,
    pub code: String,
    pub name: Option<String>,
    pub participants: Vec<Participant>,
    pub exclusions: Vec<Exclusion>,
    pub assignment: Assignment,
    pub meta: DrawMeta,
    pub created_at: u64,
}

impl DrawRecord {
    pub fn rows(&self) -> Vec<AssignmentRow> {
        assignment_rows(&self.assignment, &self.participants)
    }

    pub fn notices(&self, link: &str) -> Vec<Notice> {
        build_notices(
            &self.participants,
            &self.rows(),
            &self.exclusions,
            &self.meta,
            Some(&self.code),
            Some(link),
        )
    }

    /// Swaps `old` for `new` across participants, exclusions and the
    /// assignment. Returns false when `old` is not in the draw.
    pub fn rename_participant(&mut self, old: &str, new: &str) -> bool {
        let Some(participant) = self.participants.iter_mut().find(|p| p.email == old) else {
            return false;
        };
        participant.email = new.to_string();

        let rename = |email: String| if email == old { new.to_string() } else { email };
        for exclusion in self.exclusions.iter_mut() {
            exclusion.giver = rename(std::mem::take(&mut exclusion.giver));
            exclusion.receiver = rename(std::mem::take(&mut exclusion.receiver));
        }
        self.assignment = std::mem::take(&mut self.assignment)
            .into_iter()
            .map(|(giver, receiver)| (rename(giver), rename(receiver)))
            .collect();
        true
    }

    fn view(&self) -> DrawView {
        DrawView {
            id: self.id.clone(),
            code: self.code.clone(),
            name: self.name.clone(),
            participants: self.participants.clone(),
            exclusions: self.exclusions.clone(),
            assignment: self.rows(),
            meta: self.meta.clone(),
            created_at: self.created_at,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/draw", post(create_draw))
        .route("/draw/:code", get(get_draw))
        .route("/draw/:code/notices", get(get_notices))
        .route("/draw/:code/participants/:email", patch(update_participant_email))
        .with_state(state)
}

#[derive(Deserialize)]
struct CreateDrawRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    participants: Vec<ParticipantInput>,
    #[serde(default)]
    exclusions: Vec<ExclusionInput>,
    #[serde(default)]
    meta: DrawMeta,
}

#[derive(Deserialize)]
struct DrawParams {
    seed: Option<u64>,
}

#[derive(Serialize)]
struct CreateDrawResponse {
    ok: bool,
    draw_id: String,
    draw_code: String,
    draw_link: String,
    assignment: Vec<AssignmentRow>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct DrawView {
    id: String,
    code: String,
    name: Option<String>,
    participants: Vec<Participant>,
    exclusions: Vec<Exclusion>,
    assignment: Vec<AssignmentRow>,
    meta: DrawMeta,
    created_at: u64,
}

#[derive(Serialize)]
struct DrawResponse {
    ok: bool,
    draw: DrawView,
}

#[derive(Serialize)]
struct NoticesResponse {
    ok: bool,
    notices: Vec<Notice>,
}

#[derive(Deserialize)]
struct EmailUpdate {
    email: String,
}

async fn health() -> &'static str {
    "ok"
}

async fn create_draw(
    State(state): State<AppState>,
    Query(params): Query<DrawParams>,
    Json(payload): Json<CreateDrawRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let roster = Roster::validate(&payload.participants, &payload.exclusions)?;
    let emails = roster.emails();
    let exclusions = roster.exclusions().to_vec();

    // The search can take a while on dense exclusion sets; keep it off the executor.
    let solver = state.solver;
    let (emails, exclusions, outcome) = tokio::task::spawn_blocking(move || {
        let mut rng = params
            .seed
            .map(ChaCha8Rng::seed_from_u64)
            .unwrap_or_else(ChaCha8Rng::from_entropy);
        let outcome = solve_with(&emails, &exclusions, &solver, &mut rng);
        (emails, exclusions, outcome)
    })
    .await
    .map_err(|err| ApiError::Internal(format!("solver task failed: {err}")))?;

    let assignment = outcome?;
    verify_assignment(&emails, &exclusions, &assignment)?;

    let (participants, exclusions) = roster.into_parts();
    let mut draws = state.draws.write().await;
    let code = fresh_code(&draws);
    let record = DrawRecord {
        id: Uuid::new_v4().to_string(),
        code: code.clone(),
        name: payload
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        participants,
        exclusions,
        assignment,
        meta: payload.meta.cleaned(),
        created_at: now_millis(),
    };
    let response = CreateDrawResponse {
        ok: true,
        draw_id: record.id.clone(),
        draw_code: code.clone(),
        draw_link: state.draw_link(&code),
        assignment: record.rows(),
    };
    info!(
        "draw {code} created with {} participants and {} exclusions",
        record.participants.len(),
        record.exclusions.len()
    );
    draws.insert(code, record);

    drop(draws);
    state.persist().await;

    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_draw(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let draws = state.draws.read().await;
    let record = lookup(&draws, &code)
        .and_then(|key| draws.get(&key))
        .ok_or_else(|| ApiError::NotFound("draw not found".into()))?;

    Ok(Json(DrawResponse {
        ok: true,
        draw: record.view(),
    }))
}

async fn get_notices(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let draws = state.draws.read().await;
    let record = lookup(&draws, &code)
        .and_then(|key| draws.get(&key))
        .ok_or_else(|| ApiError::NotFound("draw not found".into()))?;

    Ok(Json(NoticesResponse {
        ok: true,
        notices: record.notices(&state.draw_link(&record.code)),
    }))
}

async fn update_participant_email(
    State(state): State<AppState>,
    Path((code, email)): Path<(String, String)>,
    Json(payload): Json<EmailUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let old = normalize_email(&email);
    let new = normalize_email(&payload.email);
    if !new.contains('@') || !new.contains('.') {
        return Err(ApiError::BadRequest("invalid email".into()));
    }

    let mut draws = state.draws.write().await;
    let record = lookup(&draws, &code)
        .and_then(|key| draws.get_mut(&key))
        .ok_or_else(|| ApiError::NotFound("draw not found".into()))?;

    if old != new && record.participants.iter().any(|p| p.email == new) {
        return Err(ApiError::Conflict(format!("{new} is already in this draw")));
    }
    if !record.rename_participant(&old, &new) {
        return Err(ApiError::NotFound("participant not found".into()));
    }
    info!("draw {}: participant email changed", record.code);
    let view = record.view();

    drop(draws);
    state.persist().await;

    Ok(Json(DrawResponse { ok: true, draw: view }))
}

/// Resolves a draw code (any case) or public id to its storage key.
fn lookup(draws: &HashMap<String, DrawRecord>, key: &str) -> Option<String> {
    let key = key.trim();
    let code = key.to_uppercase();
    if draws.contains_key(&code) {
        return Some(code);
    }
    draws
        .values()
        .find(|record| record.id == key)
        .map(|record| record.code.clone())
}

fn fresh_code(draws: &HashMap<String, DrawRecord>) -> String {
    loop {
        let code: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(CODE_LEN)
            .collect::<String>()
            .to_uppercase();
        if !draws.contains_key(&code) {
            return code;
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
