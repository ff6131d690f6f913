use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use super::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, Customer, CustomerRegistration, CustomerUpdate};
use crate::state::AppState;

// POST /api/customers
pub async fn register_customer(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CustomerRegistration>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    let customer = body.into_customer(uuid::Uuid::new_v4().to_string());
    customer.validate().map_err(AppError::BadRequest)?;

    queries::insert_customer(&state.db(), &customer)?;
    tracing::info!(customer_id = %customer.customer_id, "customer registered");

    Ok((StatusCode::CREATED, Json(customer)))
}

// GET /api/customers/:id
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, AppError> {
    let customer = queries::get_customer(&state.db(), &id)?
        .ok_or_else(|| AppError::NotFound(format!("customer {id}")))?;
    Ok(Json(customer))
}

// PATCH /api/customers/:id
pub async fn update_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CustomerUpdate>,
) -> Result<Json<Customer>, AppError> {
    let db = state.db();
    let mut customer = queries::get_customer(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("customer {id}")))?;

    customer.apply(body);
    customer.validate().map_err(AppError::BadRequest)?;
    queries::update_customer(&db, &customer)?;

    tracing::info!(customer_id = %id, "customer profile updated");
    Ok(Json(customer))
}

// GET /api/customers
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Customer>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let customers = queries::list_customers(&state.db())?;
    Ok(Json(customers))
}

// GET /api/customers/:id/bookings
pub async fn customer_bookings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state.lifecycle.store().load_bookings_for_customer(&id).await?;
    Ok(Json(bookings))
}
