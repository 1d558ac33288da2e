use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use chrono::{DateTime, Utc};
use diesel::dsl::{count_star, max};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::customers::validation::{validate_create, validate_update};
use crate::shared::error::ApiError;
use crate::shared::schema::{customers, quotations, sales_orders};
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = customers)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub name: Option<String>,
    pub customer_name: Option<String>,
    pub company_name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub billing_address: Option<String>,
    pub customer_type: String,
    pub classification: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Display name is resolved from an ordered list of candidate fields;
    /// the first non-empty one wins.
    pub fn display_name(&self) -> Option<&str> {
        [
            self.name.as_deref(),
            self.customer_name.as_deref(),
            self.company_name.as_deref(),
            self.full_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
    }

    pub fn mailing_address(&self) -> Option<&str> {
        [self.address.as_deref(), self.billing_address.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    pub name: Option<String>,
    pub customer_name: Option<String>,
    pub company_name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub billing_address: Option<String>,
    pub customer_type: Option<String>,
    pub classification: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub customer_name: Option<String>,
    pub company_name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub billing_address: Option<String>,
    pub customer_type: Option<String>,
    pub classification: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerListQuery {
    pub customer_type: Option<String>,
    pub classification: Option<String>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct CustomerListResponse {
    pub customers: Vec<Customer>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStats {
    pub total_customers: i64,
    pub active_customers: i64,
    pub by_type: HashMap<String, i64>,
    pub by_classification: HashMap<String, i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub customer: Customer,
    pub quotation_count: i64,
    pub sales_order_count: i64,
    pub last_quotation_at: Option<DateTime<Utc>>,
}

pub fn page_params(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = match limit {
        Some(l) if l > 0 => l,
        _ => 50,
    };
    let offset = match offset {
        Some(o) if o >= 0 => o,
        _ => 0,
    };
    (limit, offset)
}

pub fn paginate(total: i64, limit: i64, offset: i64) -> Pagination {
    Pagination {
        page: offset / limit + 1,
        limit,
        total,
        pages: (total + limit - 1) / limit,
    }
}

/// The older name/email search path runs instead of the structured filter
/// path whenever either legacy field is present.
pub fn uses_legacy_search(query: &CustomerListQuery) -> bool {
    query.name.is_some() || query.email.is_some()
}

pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<CustomerListResponse>, ApiError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || -> Result<CustomerListResponse, ApiError> {
        let mut conn = pool.get()?;
        let (limit, offset) = page_params(query.limit, query.offset);

        if uses_legacy_search(&query) {
            let mut q = customers::table.into_boxed();

            if let Some(name) = &query.name {
                let pattern = format!("%{name}%");
                q = q.filter(
                    customers::name
                        .ilike(pattern.clone())
                        .or(customers::customer_name.ilike(pattern.clone()))
                        .or(customers::company_name.ilike(pattern.clone()))
                        .or(customers::full_name.ilike(pattern)),
                );
            }

            if let Some(email) = &query.email {
                let pattern = format!("%{email}%");
                q = q.filter(customers::email.ilike(pattern));
            }

            let rows: Vec<Customer> = q
                .order(customers::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(&mut conn)?;

            // Legacy quirk kept on purpose: the reported total is the
            // directory-wide customer count, not the legacy match count.
            let total: i64 = customers::table.count().get_result(&mut conn)?;

            return Ok(CustomerListResponse {
                customers: rows,
                pagination: paginate(total, limit, offset),
            });
        }

        let mut q = customers::table.into_boxed();

        if let Some(customer_type) = &query.customer_type {
            q = q.filter(customers::customer_type.eq(customer_type.clone()));
        }

        if let Some(classification) = &query.classification {
            q = q.filter(customers::classification.eq(classification.clone()));
        }

        if let Some(is_active) = query.is_active {
            q = q.filter(customers::is_active.eq(is_active));
        }

        if let Some(search) = &query.search {
            let pattern = format!("%{search}%");
            q = q.filter(
                customers::name
                    .ilike(pattern.clone())
                    .or(customers::customer_name.ilike(pattern.clone()))
                    .or(customers::company_name.ilike(pattern.clone()))
                    .or(customers::full_name.ilike(pattern.clone()))
                    .or(customers::email.ilike(pattern)),
            );
        }

        let rows: Vec<Customer> = q
            .order(customers::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)?;

        // Boxed queries are single-use, so the count applies the same
        // filter set to a fresh query.
        let mut cq = customers::table.select(count_star()).into_boxed();

        if let Some(customer_type) = &query.customer_type {
            cq = cq.filter(customers::customer_type.eq(customer_type.clone()));
        }

        if let Some(classification) = &query.classification {
            cq = cq.filter(customers::classification.eq(classification.clone()));
        }

        if let Some(is_active) = query.is_active {
            cq = cq.filter(customers::is_active.eq(is_active));
        }

        if let Some(search) = &query.search {
            let pattern = format!("%{search}%");
            cq = cq.filter(
                customers::name
                    .ilike(pattern.clone())
                    .or(customers::customer_name.ilike(pattern.clone()))
                    .or(customers::company_name.ilike(pattern.clone()))
                    .or(customers::full_name.ilike(pattern.clone()))
                    .or(customers::email.ilike(pattern)),
            );
        }

        let total: i64 = cq.first(&mut conn)?;

        Ok(CustomerListResponse {
            customers: rows,
            pagination: paginate(total, limit, offset),
        })
    })
    .await??;

    Ok(Json(result))
}

pub async fn get_customer_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CustomerStats>, ApiError> {
    let pool = state.conn.clone();

    let stats = tokio::task::spawn_blocking(move || -> Result<CustomerStats, ApiError> {
        let mut conn = pool.get()?;

        let total_customers: i64 = customers::table.count().get_result(&mut conn)?;

        let active_customers: i64 = customers::table
            .filter(customers::is_active.eq(true))
            .count()
            .get_result(&mut conn)?;

        let by_type: HashMap<String, i64> = customers::table
            .group_by(customers::customer_type)
            .select((customers::customer_type, count_star()))
            .load::<(String, i64)>(&mut conn)?
            .into_iter()
            .collect();

        let by_classification: HashMap<String, i64> = customers::table
            .group_by(customers::classification)
            .select((customers::classification, count_star()))
            .load::<(Option<String>, i64)>(&mut conn)?
            .into_iter()
            .map(|(c, n)| (c.unwrap_or_else(|| "unclassified".to_string()), n))
            .collect();

        Ok(CustomerStats {
            total_customers,
            active_customers,
            by_type,
            by_classification,
        })
    })
    .await??;

    Ok(Json(stats))
}

pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>, ApiError> {
    let pool = state.conn.clone();

    let customer = tokio::task::spawn_blocking(move || -> Result<Customer, ApiError> {
        let mut conn = pool.get()?;

        customers::table
            .filter(customers::id.eq(id))
            .first::<Customer>(&mut conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Customer not found".to_string()))
    })
    .await??;

    Ok(Json(customer))
}

pub async fn get_customer_details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerDetails>, ApiError> {
    let pool = state.conn.clone();

    let details = tokio::task::spawn_blocking(move || -> Result<CustomerDetails, ApiError> {
        let mut conn = pool.get()?;

        let customer = customers::table
            .filter(customers::id.eq(id))
            .first::<Customer>(&mut conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Customer not found".to_string()))?;

        let quotation_count: i64 = quotations::table
            .filter(quotations::customer_id.eq(id))
            .count()
            .get_result(&mut conn)?;

        let sales_order_count: i64 = sales_orders::table
            .filter(sales_orders::customer_id.eq(id))
            .count()
            .get_result(&mut conn)?;

        let last_quotation_at: Option<DateTime<Utc>> = quotations::table
            .filter(quotations::customer_id.eq(id))
            .select(max(quotations::created_at))
            .first(&mut conn)?;

        Ok(CustomerDetails {
            customer,
            quotation_count,
            sales_order_count,
            last_quotation_at,
        })
    })
    .await??;

    Ok(Json(details))
}

pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let errors = validate_create(&req);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let pool = state.conn.clone();

    let customer = tokio::task::spawn_blocking(move || -> Result<Customer, ApiError> {
        let mut conn = pool.get()?;

        if let Some(email) = &req.email {
            let duplicate: bool = diesel::select(diesel::dsl::exists(
                customers::table.filter(customers::email.eq(email.clone())),
            ))
            .get_result(&mut conn)?;
            if duplicate {
                return Err(ApiError::Conflict(
                    "A customer with this email already exists".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4(),
            name: req.name,
            customer_name: req.customer_name,
            company_name: req.company_name,
            full_name: req.full_name,
            email: req.email,
            phone: req.phone,
            address: req.address,
            billing_address: req.billing_address,
            customer_type: req.customer_type.unwrap_or_else(|| "Customer".to_string()),
            classification: req.classification,
            is_active: req.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        diesel::insert_into(customers::table)
            .values(&customer)
            .execute(&mut conn)?;

        Ok(customer)
    })
    .await??;

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<Json<Customer>, ApiError> {
    let errors = validate_update(&req);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let pool = state.conn.clone();

    let customer = tokio::task::spawn_blocking(move || -> Result<Customer, ApiError> {
        let mut conn = pool.get()?;
        conn.transaction::<_, ApiError, _>(|conn| apply_customer_update(conn, id, req))
    })
    .await??;

    Ok(Json(customer))
}

fn apply_customer_update(
    conn: &mut PgConnection,
    id: Uuid,
    req: UpdateCustomerRequest,
) -> Result<Customer, ApiError> {
    let now = Utc::now();

    if let Some(email) = &req.email {
        let duplicate: bool = diesel::select(diesel::dsl::exists(
            customers::table
                .filter(customers::email.eq(email.clone()))
                .filter(customers::id.ne(id)),
        ))
        .get_result(conn)?;
        if duplicate {
            return Err(ApiError::Conflict(
                "A customer with this email already exists".to_string(),
            ));
        }
    }

    let updated = diesel::update(customers::table.filter(customers::id.eq(id)))
        .set(customers::updated_at.eq(now))
        .execute(conn)?;
    if updated == 0 {
        return Err(ApiError::NotFound("Customer not found".to_string()));
    }

    if let Some(name) = req.name {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::name.eq(name))
            .execute(conn)?;
    }

    if let Some(customer_name) = req.customer_name {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::customer_name.eq(customer_name))
            .execute(conn)?;
    }

    if let Some(company_name) = req.company_name {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::company_name.eq(company_name))
            .execute(conn)?;
    }

    if let Some(full_name) = req.full_name {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::full_name.eq(full_name))
            .execute(conn)?;
    }

    if let Some(email) = req.email {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::email.eq(email))
            .execute(conn)?;
    }

    if let Some(phone) = req.phone {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::phone.eq(phone))
            .execute(conn)?;
    }

    if let Some(address) = req.address {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::address.eq(address))
            .execute(conn)?;
    }

    if let Some(billing_address) = req.billing_address {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::billing_address.eq(billing_address))
            .execute(conn)?;
    }

    if let Some(customer_type) = req.customer_type {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::customer_type.eq(customer_type))
            .execute(conn)?;
    }

    if let Some(classification) = req.classification {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::classification.eq(classification))
            .execute(conn)?;
    }

    if let Some(is_active) = req.is_active {
        diesel::update(customers::table.filter(customers::id.eq(id)))
            .set(customers::is_active.eq(is_active))
            .execute(conn)?;
    }

    let customer: Customer = customers::table
        .filter(customers::id.eq(id))
        .first(conn)?;

    Ok(customer)
}

pub fn configure_customers_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/customers",
            get(list_customers).post(create_customer),
        )
        .route("/api/customers/stats", get(get_customer_stats))
        .route(
            "/api/customers/:id",
            get(get_customer).put(update_customer),
        )
        .route("/api/customers/:id/details", get(get_customer_details))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer_with_names(
        name: Option<&str>,
        customer_name: Option<&str>,
        company_name: Option<&str>,
        full_name: Option<&str>,
    ) -> Customer {
        let now = Utc::now();
        Customer {
            id: Uuid::new_v4(),
            name: name.map(String::from),
            customer_name: customer_name.map(String::from),
            company_name: company_name.map(String::from),
            full_name: full_name.map(String::from),
            email: None,
            phone: None,
            address: None,
            billing_address: None,
            customer_type: "Customer".to_string(),
            classification: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn display_name_first_non_empty_wins() {
        let c = customer_with_names(None, Some(""), Some("Acme Ltd"), Some("Jane Doe"));
        assert_eq!(c.display_name(), Some("Acme Ltd"));

        let c = customer_with_names(Some("Acme"), Some("Other"), None, None);
        assert_eq!(c.display_name(), Some("Acme"));

        let c = customer_with_names(None, None, None, None);
        assert_eq!(c.display_name(), None);
    }

    #[test]
    fn mailing_address_prefers_address_over_billing() {
        let mut c = customer_with_names(Some("Acme"), None, None, None);
        c.billing_address = Some("PO Box 7".to_string());
        assert_eq!(c.mailing_address(), Some("PO Box 7"));
        c.address = Some("1 Main St".to_string());
        assert_eq!(c.mailing_address(), Some("1 Main St"));
    }

    #[test]
    fn page_params_defaults_on_missing_or_invalid() {
        assert_eq!(page_params(None, None), (50, 0));
        assert_eq!(page_params(Some(0), Some(-3)), (50, 0));
        assert_eq!(page_params(Some(25), Some(75)), (25, 75));
    }

    #[test]
    fn pagination_math() {
        let p = paginate(101, 50, 0);
        assert_eq!((p.page, p.pages, p.total), (1, 3, 101));

        let p = paginate(101, 50, 100);
        assert_eq!(p.page, 3);

        let p = paginate(0, 50, 0);
        assert_eq!((p.page, p.pages), (1, 0));

        let p = paginate(100, 50, 0);
        assert_eq!(p.pages, 2);
    }

    #[test]
    fn legacy_fields_select_the_legacy_path() {
        let q = CustomerListQuery {
            name: Some("acme".to_string()),
            ..Default::default()
        };
        assert!(uses_legacy_search(&q));

        let q = CustomerListQuery {
            email: Some("a@b.com".to_string()),
            search: Some("acme".to_string()),
            ..Default::default()
        };
        assert!(uses_legacy_search(&q));

        let q = CustomerListQuery {
            search: Some("acme".to_string()),
            ..Default::default()
        };
        assert!(!uses_legacy_search(&q));
    }
}
