use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/customers",
            get(handlers::customers::list_customers).post(handlers::customers::register_customer),
        )
        .route(
            "/api/customers/:id",
            get(handlers::customers::get_customer).patch(handlers::customers::update_customer),
        )
        .route(
            "/api/customers/:id/bookings",
            get(handlers::customers::customer_bookings),
        )
        .route(
            "/api/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/assign",
            post(handlers::bookings::assign_mechanic),
        )
        .route(
            "/api/bookings/:id/status",
            post(handlers::bookings::update_status),
        )
        .route(
            "/api/bookings/:id/eligible-mechanics",
            get(handlers::bookings::eligible_mechanics),
        )
        .route(
            "/api/bookings/:id/invoice",
            post(handlers::bookings::generate_invoice),
        )
        .route("/api/invoices", get(handlers::bookings::list_invoices))
        .route(
            "/api/mechanics",
            get(handlers::staff::list_mechanics).post(handlers::staff::create_mechanic),
        )
        .route(
            "/api/mechanics/:id/shifts",
            get(handlers::staff::mechanic_shifts),
        )
        .route(
            "/api/mechanics/:id/bookings",
            get(handlers::staff::mechanic_bookings),
        )
        .route("/api/shifts", post(handlers::staff::create_shift))
        .route("/api/shifts/:id/swap", post(handlers::staff::swap_shift))
        .route(
            "/api/inventory",
            get(handlers::inventory::list_inventory).post(handlers::inventory::add_item),
        )
        .route(
            "/api/inventory/:id/stock",
            post(handlers::inventory::update_stock),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
