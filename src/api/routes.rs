//! API Routes
//!
//! HTTP endpoint definitions. Endpoints translate DTOs to domain calls;
//! authorization and validation live behind them.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CallerIdentity, DomainError, Location, VisitPatch, VisitRecord};
use crate::error::AppError;
use crate::handlers::{
    CreateVisitCommand, CreateVisitHandler, DeleteVisitCommand, DeleteVisitHandler,
    UpdateVisitCommand, UpdateVisitHandler,
};
use crate::history::HistoryService;
use crate::leaderboard::{LeaderboardService, RankedLocation, RankedUser};
use crate::store::{SortDirection, SortKey};

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocationDto {
    pub place_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl TryFrom<LocationDto> for Location {
    type Error = DomainError;

    fn try_from(dto: LocationDto) -> Result<Self, Self::Error> {
        Location::new(dto.place_name, dto.latitude, dto.longitude)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateVisitRequest {
    pub location: LocationDto,
    pub visit_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVisitRequest {
    #[serde(default)]
    pub location: Option<LocationDto>,
    #[serde(default)]
    pub visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VisitResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub location: LocationDto,
    pub location_key: String,
    pub visit_date: NaiveDate,
    pub notes: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&VisitRecord> for VisitResponse {
    fn from(record: &VisitRecord) -> Self {
        Self {
            id: record.id(),
            owner_id: record.owner_id(),
            location: LocationDto {
                place_name: record.location().place_name().to_string(),
                latitude: record.location().latitude(),
                longitude: record.location().longitude(),
            },
            location_key: record.location().key().to_string(),
            visit_date: record.visit_date(),
            notes: record.notes().to_string(),
            version: record.version(),
            created_at: record.created_at(),
            updated_at: record.updated_at(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub owner_id: Uuid,
    pub entries: Vec<VisitResponse>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct UsersLeaderboardResponse {
    pub entries: Vec<RankedUser>,
}

#[derive(Debug, Serialize)]
pub struct LocationsLeaderboardResponse {
    pub entries: Vec<RankedLocation>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Visit CRUD
        .route("/visits", post(create_visit))
        .route("/visits/:record_id", get(get_visit))
        .route("/visits/:record_id", patch(update_visit))
        .route("/visits/:record_id", delete(delete_visit))
        // Personal history
        .route("/users/:user_id/history", get(get_history))
        // Leaderboards
        .route("/leaderboard/users", get(top_users))
        .route("/leaderboard/locations", get(top_locations))
}

// =========================================================================
// Endpoints
// =========================================================================

/// POST /visits - record a visit owned by the caller
async fn create_visit(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(body): Json<CreateVisitRequest>,
) -> Result<(StatusCode, Json<VisitResponse>), AppError> {
    let location = Location::try_from(body.location)?;
    let mut command = CreateVisitCommand::new(location, body.visit_date);
    if let Some(notes) = body.notes {
        command = command.with_notes(notes);
    }

    let handler = CreateVisitHandler::new(
        state.store.clone(),
        state.engine.clone(),
        state.event_log.clone(),
    );
    let record = handler.execute(command, &caller)?;

    Ok((StatusCode::CREATED, Json(VisitResponse::from(&record))))
}

/// GET /visits/:record_id - read one record, notes included
async fn get_visit(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(record_id): Path<Uuid>,
) -> Result<Json<VisitResponse>, AppError> {
    let record = state.store.get(record_id, &caller)?;
    Ok(Json(VisitResponse::from(&record)))
}

/// PATCH /visits/:record_id - edit a record
async fn update_visit(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(record_id): Path<Uuid>,
    Json(body): Json<UpdateVisitRequest>,
) -> Result<Json<VisitResponse>, AppError> {
    let patch = VisitPatch {
        location: body.location.map(Location::try_from).transpose()?,
        visit_date: body.visit_date,
        notes: body.notes,
    };

    let handler = UpdateVisitHandler::new(
        state.store.clone(),
        state.engine.clone(),
        state.event_log.clone(),
    );
    let record = handler.execute(UpdateVisitCommand::new(record_id, patch), &caller)?;

    Ok(Json(VisitResponse::from(&record)))
}

/// DELETE /visits/:record_id - tombstone a record
async fn delete_visit(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(record_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let handler = DeleteVisitHandler::new(
        state.store.clone(),
        state.engine.clone(),
        state.event_log.clone(),
    );
    handler.execute(DeleteVisitCommand::new(record_id), &caller)?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/:user_id/history - one user's visits, sorted
async fn get_history(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let sort_key = parse_sort_key(query.sort.as_deref())?;
    let direction = parse_direction(query.direction.as_deref())?;

    let service = HistoryService::new(state.store.clone());
    let records = service.history(&caller, user_id, sort_key, direction)?;

    Ok(Json(HistoryResponse {
        owner_id: user_id,
        entries: records.iter().map(VisitResponse::from).collect(),
    }))
}

/// GET /leaderboard/users - top users by distinct locations visited
async fn top_users(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<UsersLeaderboardResponse>, AppError> {
    let limit = parse_limit(query.limit)?;
    let service = LeaderboardService::new(state.engine.clone());

    Ok(Json(UsersLeaderboardResponse {
        entries: service.top_users(&caller, limit)?,
    }))
}

/// GET /leaderboard/locations - top locations by total visits
async fn top_locations(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LocationsLeaderboardResponse>, AppError> {
    let limit = parse_limit(query.limit)?;
    let service = LeaderboardService::new(state.engine.clone());

    Ok(Json(LocationsLeaderboardResponse {
        entries: service.top_locations(&caller, limit)?,
    }))
}

fn parse_sort_key(raw: Option<&str>) -> Result<SortKey, AppError> {
    match raw.unwrap_or("date") {
        "date" => Ok(SortKey::Date),
        "location" => Ok(SortKey::Location),
        other => Err(AppError::InvalidRequest(format!(
            "unknown sort key '{}', expected 'date' or 'location'",
            other
        ))),
    }
}

fn parse_direction(raw: Option<&str>) -> Result<SortDirection, AppError> {
    match raw.unwrap_or("asc") {
        "asc" => Ok(SortDirection::Asc),
        "desc" => Ok(SortDirection::Desc),
        other => Err(AppError::InvalidRequest(format!(
            "unknown direction '{}', expected 'asc' or 'desc'",
            other
        ))),
    }
}

fn parse_limit(limit: i64) -> Result<usize, AppError> {
    if limit <= 0 {
        return Err(DomainError::validation("limit must be a positive integer").into());
    }
    Ok(limit as usize)
}
