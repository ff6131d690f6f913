use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use super::{check_auth, require_non_empty};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{InventoryItem, NewInventoryItem};
use crate::state::AppState;

// GET /api/inventory
pub async fn list_inventory(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<InventoryItem>>, AppError> {
    let items = queries::list_inventory(&state.db())?;
    Ok(Json(items))
}

// POST /api/inventory
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewInventoryItem>,
) -> Result<(StatusCode, Json<InventoryItem>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    require_non_empty("item_name", &body.item_name)?;
    if body.quantity < 0 || body.price.cents() < 0 {
        return Err(AppError::BadRequest(
            "quantity and price cannot be negative".to_string(),
        ));
    }

    let item = InventoryItem {
        id: uuid::Uuid::new_v4().to_string(),
        item_name: body.item_name,
        quantity: body.quantity,
        price: body.price,
        description: body.description,
    };
    queries::insert_inventory_item(&state.db(), &item)?;
    tracing::info!(item_id = %item.id, item_name = %item.item_name, "inventory item added");

    Ok((StatusCode::CREATED, Json(item)))
}

// POST /api/inventory/:id/stock
#[derive(Deserialize)]
pub struct StockRequest {
    pub quantity: i64,
}

pub async fn update_stock(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StockRequest>,
) -> Result<Json<InventoryItem>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    if body.quantity < 0 {
        return Err(AppError::BadRequest("quantity cannot be negative".to_string()));
    }

    let db = state.db();
    if !queries::update_stock(&db, &id, body.quantity)? {
        return Err(AppError::NotFound(format!("inventory item {id}")));
    }
    let item = queries::get_inventory_item(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("inventory item {id}")))?;

    Ok(Json(item))
}
