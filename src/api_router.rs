//! Combines the per-module REST routers into a unified router.

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::customers::configure_customers_api_routes())
        .merge(crate::quotations::configure_quotations_api_routes())
}
