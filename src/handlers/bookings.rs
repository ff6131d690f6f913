use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use super::{check_auth, require_non_empty};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingInput, BookingStatus, Invoice, LaborCharge, Mechanic, Money, PartLine};
use crate::services::invoicing::{self, InvoiceInputs};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BookingInput>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    require_non_empty("customer_id", &body.customer_id)?;
    require_non_empty("service_type", &body.service_type)?;
    require_non_empty("vehicle.make", &body.vehicle.make)?;
    require_non_empty("vehicle.model", &body.vehicle.model)?;
    if body.vehicle.year < 1886 {
        return Err(AppError::BadRequest(format!(
            "invalid vehicle year: {}",
            body.vehicle.year
        )));
    }

    let booking = state.lifecycle.create_booking(&body).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub mechanic_id: Option<String>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = match query.status.as_deref() {
        Some(s) => Some(
            BookingStatus::parse(s).ok_or_else(|| AppError::BadRequest(format!("unknown status: {s}")))?,
        ),
        None => None,
    };

    let store = state.lifecycle.store();
    let bookings = match query.mechanic_id.as_deref() {
        Some(mechanic_id) => store.load_bookings_for_mechanic(mechanic_id).await?,
        None => store.load_all_bookings().await?,
    };

    Ok(Json(
        bookings
            .into_iter()
            .filter(|b| status.map_or(true, |s| b.status == s))
            .collect(),
    ))
}

async fn load_booking(state: &AppState, id: &str) -> Result<Booking, AppError> {
    state
        .lifecycle
        .store()
        .load_booking(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(load_booking(&state, &id).await?))
}

// POST /api/bookings/:id/assign
#[derive(Deserialize)]
pub struct AssignRequest {
    pub mechanic_id: String,
    pub expected_revision: Option<i64>,
}

pub async fn assign_mechanic(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let booking = state
        .lifecycle
        .assign_mechanic(&id, &body.mechanic_id, body.expected_revision)
        .await?;
    Ok(Json(booking))
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: BookingStatus,
    pub expected_revision: Option<i64>,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let booking = state
        .lifecycle
        .transition_status(&id, body.status, body.expected_revision)
        .await?;
    Ok(Json(booking))
}

// GET /api/bookings/:id/eligible-mechanics
pub async fn eligible_mechanics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<Mechanic>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let mechanics = state.lifecycle.eligible_mechanics(&id).await?;
    Ok(Json(mechanics))
}

// POST /api/bookings/:id/invoice
#[derive(Deserialize)]
pub struct InvoiceRequest {
    pub labor_hours: f64,
    pub labor_rate: Option<Money>,
    #[serde(default)]
    pub parts: Vec<PartRequest>,
}

/// A part either names an inventory item, whose name and price are used
/// unless overridden, or spells out name and unit price directly.
#[derive(Deserialize)]
pub struct PartRequest {
    pub inventory_item_id: Option<String>,
    pub name: Option<String>,
    pub quantity: i64,
    pub unit_price: Option<Money>,
}

fn labor_hundredths(hours: f64) -> Result<i64, AppError> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(AppError::BadRequest(format!("invalid labor hours: {hours}")));
    }
    Ok((hours * 100.0).round() as i64)
}

fn resolve_parts(state: &AppState, parts: Vec<PartRequest>) -> Result<Vec<PartLine>, AppError> {
    let db = state.db();
    let mut lines = Vec::with_capacity(parts.len());
    for part in parts {
        let line = match part.inventory_item_id {
            Some(item_id) => {
                let item = queries::get_inventory_item(&db, &item_id)?
                    .ok_or_else(|| AppError::NotFound(format!("inventory item {item_id}")))?;
                PartLine {
                    name: part.name.unwrap_or(item.item_name),
                    quantity: part.quantity,
                    unit_price: part.unit_price.unwrap_or(item.price),
                }
            }
            None => match (part.name, part.unit_price) {
                (Some(name), Some(unit_price)) => PartLine {
                    name,
                    quantity: part.quantity,
                    unit_price,
                },
                _ => {
                    return Err(AppError::BadRequest(
                        "parts need an inventory_item_id or both name and unit_price".to_string(),
                    ))
                }
            },
        };
        lines.push(line);
    }
    Ok(lines)
}

pub async fn generate_invoice(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<InvoiceRequest>,
) -> Result<Json<Invoice>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let booking = load_booking(&state, &id).await?;
    let inputs = InvoiceInputs {
        labor: LaborCharge {
            hours_hundredths: labor_hundredths(body.labor_hours)?,
            rate: body
                .labor_rate
                .unwrap_or(Money(state.config.labor_rate_cents)),
        },
        parts: resolve_parts(&state, body.parts)?,
    };

    let invoice = invoicing::generate_invoice(&booking, &inputs)?;
    tracing::info!(booking_id = %id, invoice_id = %invoice.id, total = %invoice.total, "invoice generated");
    Ok(Json(invoice))
}

// GET /api/invoices
#[derive(Deserialize)]
pub struct InvoicesQuery {
    pub labor_hours: Option<f64>,
}

/// One invoice per completed booking, billed at the configured rate and
/// labor time. Nothing is stored.
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<InvoicesQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let inputs = InvoiceInputs {
        labor: LaborCharge {
            hours_hundredths: match query.labor_hours {
                Some(h) => labor_hundredths(h)?,
                None => state.config.default_labor_hundredths,
            },
            rate: Money(state.config.labor_rate_cents),
        },
        parts: Vec::new(),
    };

    let bookings = state.lifecycle.store().load_all_bookings().await?;
    let mut invoices = Vec::new();
    for booking in bookings.iter().filter(|b| b.status == BookingStatus::Completed) {
        invoices.push(invoicing::generate_invoice(booking, &inputs)?);
    }
    Ok(Json(invoices))
}
