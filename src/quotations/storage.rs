//! Data access for quotations and their line items, plus the assembly of
//! list rows with resolved customer and supplier identity.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bigdecimal::BigDecimal;

use crate::customers::Customer;
use crate::quotations::api::{CreateQuotationRequest, UpdateQuotationRequest};
use crate::quotations::supplier_match::{extract_supplier_name, fuzzy_match, UNKNOWN_SUPPLIER};
use crate::shared::error::ApiError;
use crate::shared::schema::{
    customer_acceptances, customers, purchase_orders, quotation_items, quotations, sales_orders,
    suppliers,
};
use crate::shared::utils::{bd, DbPool};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = quotations)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub id: Uuid,
    pub quote_number: String,
    pub parent_quotation_id: Option<Uuid>,
    pub revision_reason: Option<String>,
    pub is_superseded: bool,
    pub customer_id: Option<Uuid>,
    pub status: String,
    pub approval_status: String,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub subtotal: BigDecimal,
    pub discount_amount: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total: BigDecimal,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = quotation_items)]
#[serde(rename_all = "camelCase")]
pub struct QuotationItem {
    pub id: Uuid,
    pub quotation_id: Uuid,
    pub description: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub amount: BigDecimal,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = suppliers)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Supplier identity embedded in a list row. A synthetic supplier (derived
/// purely from notes text, no matching row) carries `id: None` and cannot
/// be used for joins.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInfo {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub customer_type: String,
}

impl From<&Supplier> for SupplierInfo {
    fn from(s: &Supplier) -> Self {
        Self {
            id: Some(s.id),
            name: s.name.clone(),
            email: s.email.clone(),
            phone: s.phone.clone(),
            address: s.address.clone(),
            customer_type: "Supplier".to_string(),
        }
    }
}

impl SupplierInfo {
    pub fn synthetic(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            email: None,
            phone: None,
            address: None,
            customer_type: "Supplier".to_string(),
        }
    }
}

/// One list row: all quotation fields plus inlined customer/supplier data,
/// flagged so downstream consumers do not re-fetch either record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedQuotation {
    #[serde(flatten)]
    pub quotation: Quotation,
    pub supplier: Option<SupplierInfo>,
    pub supplier_name: String,
    pub customer: Option<Customer>,
    pub customer_supplier_embedded: bool,
}

/// Single-record view: quotation fields plus a flat supplier name resolved
/// through the quotation's own customer reference.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationDetail {
    #[serde(flatten)]
    pub quotation: Quotation,
    pub supplier_name: String,
}

#[derive(Debug, Default, Clone)]
pub struct QuotationFilters {
    pub customer_id: Option<Uuid>,
    pub status: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    /// Accepted by the API and recorded here, but never applied to the
    /// query.
    pub search: Option<String>,
}

impl QuotationFilters {
    pub fn from_params(
        customer_id: Option<&str>,
        status: Option<&str>,
        valid_from: Option<&str>,
        valid_until: Option<&str>,
        search: Option<&str>,
    ) -> Self {
        Self {
            customer_id: customer_id
                .filter(|v| !v.is_empty() && *v != "all")
                .and_then(|v| Uuid::parse_str(v).ok()),
            status: status
                .filter(|v| !v.is_empty() && *v != "all")
                .map(String::from),
            valid_from: valid_from.and_then(parse_date),
            valid_until: valid_until.and_then(parse_date),
            search: search.map(String::from),
        }
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn list_quotations(
    conn: &mut PgConnection,
    filters: &QuotationFilters,
) -> QueryResult<Vec<Quotation>> {
    let mut q = quotations::table.into_boxed();

    if let Some(customer_id) = filters.customer_id {
        q = q.filter(quotations::customer_id.eq(customer_id));
    }

    if let Some(status) = &filters.status {
        q = q.filter(quotations::status.eq(status.clone()));
    }

    if let Some(from) = filters.valid_from {
        q = q.filter(quotations::valid_until.ge(from));
    }

    if let Some(until) = filters.valid_until {
        q = q.filter(quotations::valid_until.le(until));
    }

    // filters.search is deliberately not applied; see DESIGN.md.

    q.order(quotations::created_at.desc()).load(conn)
}

pub fn load_suppliers(conn: &mut PgConnection) -> QueryResult<Vec<Supplier>> {
    suppliers::table.order(suppliers::name.asc()).load(conn)
}

pub fn load_customers_by_ids(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> QueryResult<HashMap<Uuid, Customer>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<Customer> = customers::table
        .filter(customers::id.eq_any(ids.to_vec()))
        .load(conn)?;
    Ok(rows.into_iter().map(|c| (c.id, c)).collect())
}

/// Note-derived supplier resolution. The notes text is the only supplier
/// channel: a matched row wins, an unmatched extraction yields a synthetic
/// supplier with no id, and absent notes fall back to "Unknown Supplier".
pub fn resolve_row(
    quotation: Quotation,
    supplier_rows: &[Supplier],
    customers_by_id: &HashMap<Uuid, Customer>,
) -> ResolvedQuotation {
    let customer = quotation
        .customer_id
        .and_then(|id| customers_by_id.get(&id))
        .cloned();

    let (supplier, supplier_name) = match quotation
        .notes
        .as_deref()
        .and_then(extract_supplier_name)
    {
        Some(extracted) => match fuzzy_match(&extracted, supplier_rows) {
            Some(found) => (Some(SupplierInfo::from(found)), found.name.clone()),
            None => (Some(SupplierInfo::synthetic(&extracted)), extracted),
        },
        None => (None, UNKNOWN_SUPPLIER.to_string()),
    };

    ResolvedQuotation {
        quotation,
        supplier,
        supplier_name,
        customer,
        customer_supplier_embedded: true,
    }
}

pub fn resolve_rows(
    rows: Vec<Quotation>,
    supplier_rows: &[Supplier],
    customers_by_id: &HashMap<Uuid, Customer>,
) -> Vec<ResolvedQuotation> {
    rows.into_iter()
        .map(|q| resolve_row(q, supplier_rows, customers_by_id))
        .collect()
}

pub fn get_quotation(conn: &mut PgConnection, id: Uuid) -> QueryResult<Option<Quotation>> {
    quotations::table
        .filter(quotations::id.eq(id))
        .first(conn)
        .optional()
}

pub fn get_quotation_detail(
    conn: &mut PgConnection,
    id: Uuid,
) -> QueryResult<Option<QuotationDetail>> {
    let Some(quotation) = get_quotation(conn, id)? else {
        return Ok(None);
    };

    let supplier_name = match quotation.customer_id {
        Some(customer_id) => customers::table
            .filter(customers::id.eq(customer_id))
            .first::<Customer>(conn)
            .optional()?
            .as_ref()
            .and_then(|c| c.display_name().map(String::from))
            .unwrap_or_else(|| UNKNOWN_SUPPLIER.to_string()),
        None => UNKNOWN_SUPPLIER.to_string(),
    };

    Ok(Some(QuotationDetail {
        quotation,
        supplier_name,
    }))
}

pub fn list_items(conn: &mut PgConnection, quotation_id: Uuid) -> QueryResult<Vec<QuotationItem>> {
    quotation_items::table
        .filter(quotation_items::quotation_id.eq(quotation_id))
        .order(quotation_items::sort_order.asc())
        .load(conn)
}

fn generate_quote_number(conn: &mut PgConnection) -> QueryResult<String> {
    let count: i64 = quotations::table.count().get_result(conn)?;
    Ok(format!("QUO-{:06}", count + 1))
}

/// Quotation and line items commit together or not at all.
pub fn create_quotation(
    conn: &mut PgConnection,
    req: CreateQuotationRequest,
) -> Result<Quotation, diesel::result::Error> {
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let quote_number = match req.quote_number {
            Some(n) if !n.trim().is_empty() => n,
            _ => generate_quote_number(conn)?,
        };

        let quotation = Quotation {
            id,
            quote_number,
            parent_quotation_id: req.parent_quotation_id,
            revision_reason: req.revision_reason,
            is_superseded: false,
            customer_id: req.customer_id,
            status: req.status.unwrap_or_else(|| "draft".to_string()),
            approval_status: req
                .approval_status
                .unwrap_or_else(|| "pending".to_string()),
            approved_by: None,
            approved_at: None,
            subtotal: bd(req.subtotal.unwrap_or(0.0)),
            discount_amount: bd(req.discount_amount.unwrap_or(0.0)),
            tax_amount: bd(req.tax_amount.unwrap_or(0.0)),
            total: bd(req.total.unwrap_or(0.0)),
            valid_until: req.valid_until.as_deref().and_then(parse_date),
            notes: req.notes,
            created_by: req.created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };

        diesel::insert_into(quotations::table)
            .values(&quotation)
            .execute(conn)?;

        for (idx, item) in req.items.unwrap_or_default().into_iter().enumerate() {
            let quotation_item = QuotationItem {
                id: Uuid::new_v4(),
                quotation_id: id,
                description: item.description,
                quantity: bd(item.quantity),
                unit_price: bd(item.unit_price),
                amount: bd(item.quantity * item.unit_price),
                sort_order: idx as i32,
                created_at: now,
            };

            diesel::insert_into(quotation_items::table)
                .values(&quotation_item)
                .execute(conn)?;
        }

        Ok(quotation)
    })
}

/// The per-field statements run inside one transaction so a mid-sequence
/// failure rolls back the fields already applied.
pub fn update_quotation(
    conn: &mut PgConnection,
    id: Uuid,
    req: UpdateQuotationRequest,
) -> Result<(), ApiError> {
    conn.transaction::<_, ApiError, _>(|conn| apply_quotation_update(conn, id, req))
}

fn apply_quotation_update(
    conn: &mut PgConnection,
    id: Uuid,
    req: UpdateQuotationRequest,
) -> Result<(), ApiError> {
    let now = Utc::now();

    let updated = diesel::update(quotations::table.filter(quotations::id.eq(id)))
        .set(quotations::updated_at.eq(now))
        .execute(conn)?;
    if updated == 0 {
        return Err(ApiError::NotFound("Quotation not found".to_string()));
    }

    if let Some(customer_id) = req.customer_id {
        diesel::update(quotations::table.filter(quotations::id.eq(id)))
            .set(quotations::customer_id.eq(customer_id))
            .execute(conn)?;
    }

    if let Some(status) = req.status {
        diesel::update(quotations::table.filter(quotations::id.eq(id)))
            .set(quotations::status.eq(status))
            .execute(conn)?;
    }

    if let Some(approval_status) = req.approval_status {
        diesel::update(quotations::table.filter(quotations::id.eq(id)))
            .set(quotations::approval_status.eq(approval_status))
            .execute(conn)?;
    }

    if let Some(approved_by) = req.approved_by {
        diesel::update(quotations::table.filter(quotations::id.eq(id)))
            .set((
                quotations::approved_by.eq(approved_by),
                quotations::approved_at.eq(now),
            ))
            .execute(conn)?;
    }

    if let Some(revision_reason) = req.revision_reason {
        diesel::update(quotations::table.filter(quotations::id.eq(id)))
            .set(quotations::revision_reason.eq(revision_reason))
            .execute(conn)?;
    }

    if let Some(is_superseded) = req.is_superseded {
        diesel::update(quotations::table.filter(quotations::id.eq(id)))
            .set(quotations::is_superseded.eq(is_superseded))
            .execute(conn)?;
    }

    if let Some(subtotal) = req.subtotal {
        diesel::update(quotations::table.filter(quotations::id.eq(id)))
            .set(quotations::subtotal.eq(bd(subtotal)))
            .execute(conn)?;
    }

    if let Some(discount_amount) = req.discount_amount {
        diesel::update(quotations::table.filter(quotations::id.eq(id)))
            .set(quotations::discount_amount.eq(bd(discount_amount)))
            .execute(conn)?;
    }

    if let Some(tax_amount) = req.tax_amount {
        diesel::update(quotations::table.filter(quotations::id.eq(id)))
            .set(quotations::tax_amount.eq(bd(tax_amount)))
            .execute(conn)?;
    }

    if let Some(total) = req.total {
        diesel::update(quotations::table.filter(quotations::id.eq(id)))
            .set(quotations::total.eq(bd(total)))
            .execute(conn)?;
    }

    if let Some(valid_until) = req.valid_until.as_deref().and_then(parse_date) {
        diesel::update(quotations::table.filter(quotations::id.eq(id)))
            .set(quotations::valid_until.eq(valid_until))
            .execute(conn)?;
    }

    if let Some(notes) = req.notes {
        diesel::update(quotations::table.filter(quotations::id.eq(id)))
            .set(quotations::notes.eq(notes))
            .execute(conn)?;
    }

    if let Some(updated_by) = req.updated_by {
        diesel::update(quotations::table.filter(quotations::id.eq(id)))
            .set(quotations::updated_by.eq(updated_by))
            .execute(conn)?;
    }

    Ok(())
}

/// Fan-out existence check across the three dependent tables. Each check
/// runs on its own pooled connection; the results are OR-combined.
pub async fn has_references(pool: &DbPool, id: Uuid) -> Result<bool, ApiError> {
    let sales_pool = pool.clone();
    let sales = tokio::task::spawn_blocking(move || -> Result<bool, ApiError> {
        let mut conn = sales_pool.get()?;
        Ok(diesel::select(diesel::dsl::exists(
            sales_orders::table.filter(sales_orders::quotation_id.eq(id)),
        ))
        .get_result(&mut conn)?)
    });

    let acceptance_pool = pool.clone();
    let acceptances = tokio::task::spawn_blocking(move || -> Result<bool, ApiError> {
        let mut conn = acceptance_pool.get()?;
        Ok(diesel::select(diesel::dsl::exists(
            customer_acceptances::table.filter(customer_acceptances::quotation_id.eq(id)),
        ))
        .get_result(&mut conn)?)
    });

    let purchase_pool = pool.clone();
    let purchases = tokio::task::spawn_blocking(move || -> Result<bool, ApiError> {
        let mut conn = purchase_pool.get()?;
        Ok(diesel::select(diesel::dsl::exists(
            purchase_orders::table.filter(purchase_orders::quotation_id.eq(id)),
        ))
        .get_result(&mut conn)?)
    });

    let (sales, acceptances, purchases) = tokio::try_join!(sales, acceptances, purchases)?;

    Ok(sales? || acceptances? || purchases?)
}

/// Deletion refuses while any dependent record still points at the
/// quotation, then removes line items and the quotation in one
/// transaction.
pub async fn delete_quotation(pool: &DbPool, id: Uuid) -> Result<(), ApiError> {
    if has_references(pool, id).await? {
        return Err(ApiError::Conflict(
            "Quotation is referenced by sales orders, purchase orders or customer acceptances"
                .to_string(),
        ));
    }

    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
        let mut conn = pool.get()?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::delete(
                quotation_items::table.filter(quotation_items::quotation_id.eq(id)),
            )
            .execute(conn)?;

            let deleted = diesel::delete(quotations::table.filter(quotations::id.eq(id)))
                .execute(conn)?;
            if deleted == 0 {
                return Err(diesel::result::Error::NotFound);
            }

            Ok(())
        })
        .map_err(|e| match e {
            diesel::result::Error::NotFound => {
                ApiError::NotFound("Quotation not found".to_string())
            }
            other => ApiError::from(other),
        })
    })
    .await??;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quotation_with_notes(notes: Option<&str>) -> Quotation {
        let now = Utc::now();
        Quotation {
            id: Uuid::new_v4(),
            quote_number: "QUO-000001".to_string(),
            parent_quotation_id: None,
            revision_reason: None,
            is_superseded: false,
            customer_id: None,
            status: "draft".to_string(),
            approval_status: "pending".to_string(),
            approved_by: None,
            approved_at: None,
            subtotal: bd(100.0),
            discount_amount: bd(0.0),
            tax_amount: bd(20.0),
            total: bd(120.0),
            valid_until: None,
            notes: notes.map(String::from),
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn supplier(name: &str) -> Supplier {
        Supplier {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: Some("sales@example.test".to_string()),
            phone: None,
            address: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn unmatched_extraction_yields_synthetic_supplier() {
        let row = quotation_with_notes(Some("Suppliers: Acme Corp, Beta Inc"));
        let resolved = resolve_row(row, &[], &HashMap::new());

        assert_eq!(resolved.supplier_name, "Acme Corp");
        let supplier = resolved.supplier.expect("synthetic supplier expected");
        assert!(supplier.id.is_none());
        assert_eq!(supplier.name, "Acme Corp");
        assert!(resolved.customer_supplier_embedded);
    }

    #[test]
    fn matched_supplier_row_wins_over_extracted_text() {
        let acme = supplier("ACME CORP LTD");
        let acme_id = acme.id;
        let rows = vec![acme, supplier("Beta Inc")];

        let row = quotation_with_notes(Some("Suppliers: Acme Corp, Beta Inc"));
        let resolved = resolve_row(row, &rows, &HashMap::new());

        assert_eq!(resolved.supplier_name, "ACME CORP LTD");
        assert_eq!(resolved.supplier.unwrap().id, Some(acme_id));
    }

    #[test]
    fn notes_without_marker_default_to_unknown_supplier() {
        let row = quotation_with_notes(Some("deliver before friday"));
        let resolved = resolve_row(row, &[supplier("Acme")], &HashMap::new());
        assert_eq!(resolved.supplier_name, UNKNOWN_SUPPLIER);
        assert!(resolved.supplier.is_none());

        let row = quotation_with_notes(None);
        let resolved = resolve_row(row, &[], &HashMap::new());
        assert_eq!(resolved.supplier_name, UNKNOWN_SUPPLIER);
    }

    #[test]
    fn filters_treat_all_and_empty_as_no_filter() {
        let f = QuotationFilters::from_params(Some("all"), Some("all"), None, None, None);
        assert!(f.customer_id.is_none());
        assert!(f.status.is_none());

        let f = QuotationFilters::from_params(Some(""), Some(""), None, None, None);
        assert!(f.customer_id.is_none());
        assert!(f.status.is_none());

        let id = Uuid::new_v4();
        let f = QuotationFilters::from_params(
            Some(&id.to_string()),
            Some("sent"),
            Some("2025-01-01"),
            Some("2025-12-31"),
            Some("acme"),
        );
        assert_eq!(f.customer_id, Some(id));
        assert_eq!(f.status.as_deref(), Some("sent"));
        assert_eq!(f.valid_from, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(f.valid_until, NaiveDate::from_ymd_opt(2025, 12, 31));
        // recorded but never applied to the query
        assert_eq!(f.search.as_deref(), Some("acme"));
    }

    #[test]
    fn malformed_filter_values_are_dropped() {
        let f = QuotationFilters::from_params(
            Some("not-a-uuid"),
            None,
            Some("01/01/2025"),
            None,
            None,
        );
        assert!(f.customer_id.is_none());
        assert!(f.valid_from.is_none());
    }
}
