use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{check_auth, require_non_empty};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, Mechanic, Shift};
use crate::state::AppState;

// GET /api/mechanics
pub async fn list_mechanics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Mechanic>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let mechanics = queries::list_mechanics(&state.db())?;
    Ok(Json(mechanics))
}

// POST /api/mechanics
#[derive(Deserialize)]
pub struct NewMechanic {
    pub name: String,
    pub email: String,
    pub specialization: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

pub async fn create_mechanic(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewMechanic>,
) -> Result<(StatusCode, Json<Mechanic>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    require_non_empty("name", &body.name)?;
    require_non_empty("email", &body.email)?;

    let mechanic = Mechanic {
        id: uuid::Uuid::new_v4().to_string(),
        name: body.name,
        email: body.email,
        specialization: body.specialization,
        is_active: body.is_active,
    };
    queries::insert_mechanic(&state.db(), &mechanic)?;
    tracing::info!(mechanic_id = %mechanic.id, "mechanic added");

    Ok((StatusCode::CREATED, Json(mechanic)))
}

// GET /api/mechanics/:id/shifts
pub async fn mechanic_shifts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<Shift>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let mut shifts = state
        .lifecycle
        .store()
        .load_shifts_for_mechanics(std::slice::from_ref(&id))
        .await?;
    Ok(Json(shifts.remove(&id).unwrap_or_default()))
}

// GET /api/mechanics/:id/bookings
pub async fn mechanic_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let bookings = state.lifecycle.store().load_bookings_for_mechanic(&id).await?;
    Ok(Json(bookings))
}

// POST /api/shifts
#[derive(Deserialize)]
pub struct NewShift {
    pub mechanic_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub async fn create_shift(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewShift>,
) -> Result<(StatusCode, Json<Shift>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let shift = Shift {
        id: uuid::Uuid::new_v4().to_string(),
        mechanic_id: body.mechanic_id,
        start: body.start,
        end: body.end,
    };
    if !shift.is_well_formed() {
        return Err(AppError::BadRequest("shift must not end before it starts".to_string()));
    }

    let db = state.db();
    if queries::get_mechanic(&db, &shift.mechanic_id)?.is_none() {
        return Err(AppError::NotFound(format!("mechanic {}", shift.mechanic_id)));
    }
    queries::insert_shift(&db, &shift)?;
    tracing::info!(shift_id = %shift.id, mechanic_id = %shift.mechanic_id, "shift scheduled");

    Ok((StatusCode::CREATED, Json(shift)))
}

// POST /api/shifts/:id/swap
#[derive(Deserialize)]
pub struct SwapRequest {
    pub mechanic_id: String,
}

pub async fn swap_shift(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<SwapRequest>,
) -> Result<Json<Shift>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db();
    if queries::get_mechanic(&db, &body.mechanic_id)?.is_none() {
        return Err(AppError::NotFound(format!("mechanic {}", body.mechanic_id)));
    }
    if !queries::reassign_shift(&db, &id, &body.mechanic_id)? {
        return Err(AppError::NotFound(format!("shift {id}")));
    }
    let shift = queries::get_shift(&db, &id)?.ok_or_else(|| AppError::NotFound(format!("shift {id}")))?;
    tracing::info!(shift_id = %id, mechanic_id = %body.mechanic_id, "shift swapped");

    Ok(Json(shift))
}
