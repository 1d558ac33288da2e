use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::quotations::storage::{
    self, QuotationDetail, QuotationFilters, QuotationItem, ResolvedQuotation,
};
use crate::shared::error::ApiError;
use crate::shared::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationListQuery {
    pub customer_id: Option<String>,
    pub status: Option<String>,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuotationRequest {
    pub quote_number: Option<String>,
    pub customer_id: Option<Uuid>,
    pub parent_quotation_id: Option<Uuid>,
    pub revision_reason: Option<String>,
    pub status: Option<String>,
    pub approval_status: Option<String>,
    pub subtotal: Option<f64>,
    pub discount_amount: Option<f64>,
    pub tax_amount: Option<f64>,
    pub total: Option<f64>,
    pub valid_until: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub items: Option<Vec<CreateQuotationItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuotationItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuotationRequest {
    pub customer_id: Option<Uuid>,
    pub status: Option<String>,
    pub approval_status: Option<String>,
    pub approved_by: Option<Uuid>,
    pub revision_reason: Option<String>,
    pub is_superseded: Option<bool>,
    pub subtotal: Option<f64>,
    pub discount_amount: Option<f64>,
    pub tax_amount: Option<f64>,
    pub total: Option<f64>,
    pub valid_until: Option<String>,
    pub notes: Option<String>,
    pub updated_by: Option<Uuid>,
}

pub async fn list_quotations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuotationListQuery>,
) -> Result<Json<Vec<ResolvedQuotation>>, ApiError> {
    let pool = state.conn.clone();

    let rows = tokio::task::spawn_blocking(move || -> Result<Vec<ResolvedQuotation>, ApiError> {
        let mut conn = pool.get()?;

        let filters = QuotationFilters::from_params(
            query.customer_id.as_deref(),
            query.status.as_deref(),
            query.valid_from.as_deref(),
            query.valid_until.as_deref(),
            query.search.as_deref(),
        );

        let quotations = storage::list_quotations(&mut conn, &filters)?;
        let suppliers = storage::load_suppliers(&mut conn)?;

        let customer_ids: Vec<Uuid> = quotations.iter().filter_map(|q| q.customer_id).collect();
        let customers_by_id = storage::load_customers_by_ids(&mut conn, &customer_ids)?;

        Ok(storage::resolve_rows(quotations, &suppliers, &customers_by_id))
    })
    .await??;

    Ok(Json(rows))
}

pub async fn get_quotation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuotationDetail>, ApiError> {
    let pool = state.conn.clone();

    let detail = tokio::task::spawn_blocking(move || -> Result<QuotationDetail, ApiError> {
        let mut conn = pool.get()?;

        storage::get_quotation_detail(&mut conn, id)?
            .ok_or_else(|| ApiError::NotFound("Quotation not found".to_string()))
    })
    .await??;

    Ok(Json(detail))
}

pub async fn get_quotation_items(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<QuotationItem>>, ApiError> {
    let pool = state.conn.clone();

    let items = tokio::task::spawn_blocking(move || -> Result<Vec<QuotationItem>, ApiError> {
        let mut conn = pool.get()?;
        Ok(storage::list_items(&mut conn, id)?)
    })
    .await??;

    Ok(Json(items))
}

pub async fn create_quotation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateQuotationRequest>,
) -> Result<(StatusCode, Json<QuotationDetail>), ApiError> {
    let pool = state.conn.clone();

    let detail = tokio::task::spawn_blocking(move || -> Result<QuotationDetail, ApiError> {
        let mut conn = pool.get()?;

        let quotation = storage::create_quotation(&mut conn, req)?;

        storage::get_quotation_detail(&mut conn, quotation.id)?
            .ok_or_else(|| ApiError::Database("created quotation could not be re-read".to_string()))
    })
    .await??;

    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update_quotation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateQuotationRequest>,
) -> Result<Json<QuotationDetail>, ApiError> {
    let pool = state.conn.clone();

    let detail = tokio::task::spawn_blocking(move || -> Result<QuotationDetail, ApiError> {
        let mut conn = pool.get()?;

        storage::update_quotation(&mut conn, id, req)?;

        storage::get_quotation_detail(&mut conn, id)?
            .ok_or_else(|| ApiError::NotFound("Quotation not found".to_string()))
    })
    .await??;

    Ok(Json(detail))
}

pub async fn delete_quotation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    storage::delete_quotation(&state.conn, id).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn configure_quotations_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/quotations",
            get(list_quotations).post(create_quotation),
        )
        .route(
            "/api/quotations/:id",
            get(get_quotation)
                .put(update_quotation)
                .delete(delete_quotation),
        )
        .route("/api/quotations/:id/items", get(get_quotation_items))
}
