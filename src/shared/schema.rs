diesel::table! {
    customers (id) {
        id -> Uuid,
        name -> Nullable<Varchar>,
        customer_name -> Nullable<Varchar>,
        company_name -> Nullable<Varchar>,
        full_name -> Nullable<Varchar>,
        email -> Nullable<Varchar>,
        phone -> Nullable<Varchar>,
        address -> Nullable<Text>,
        billing_address -> Nullable<Text>,
        customer_type -> Varchar,
        classification -> Nullable<Varchar>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    suppliers (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Nullable<Varchar>,
        phone -> Nullable<Varchar>,
        address -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    quotations (id) {
        id -> Uuid,
        quote_number -> Varchar,
        parent_quotation_id -> Nullable<Uuid>,
        revision_reason -> Nullable<Text>,
        is_superseded -> Bool,
        customer_id -> Nullable<Uuid>,
        status -> Varchar,
        approval_status -> Varchar,
        approved_by -> Nullable<Uuid>,
        approved_at -> Nullable<Timestamptz>,
        subtotal -> Numeric,
        discount_amount -> Numeric,
        tax_amount -> Numeric,
        total -> Numeric,
        valid_until -> Nullable<Date>,
        notes -> Nullable<Text>,
        created_by -> Nullable<Uuid>,
        updated_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    quotation_items (id) {
        id -> Uuid,
        quotation_id -> Uuid,
        description -> Varchar,
        quantity -> Numeric,
        unit_price -> Numeric,
        amount -> Numeric,
        sort_order -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    sales_orders (id) {
        id -> Uuid,
        order_number -> Varchar,
        quotation_id -> Nullable<Uuid>,
        customer_id -> Nullable<Uuid>,
        status -> Varchar,
        total -> Numeric,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    purchase_orders (id) {
        id -> Uuid,
        po_number -> Varchar,
        quotation_id -> Nullable<Uuid>,
        supplier_id -> Nullable<Uuid>,
        status -> Varchar,
        total -> Numeric,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    customer_acceptances (id) {
        id -> Uuid,
        quotation_id -> Nullable<Uuid>,
        customer_id -> Nullable<Uuid>,
        accepted_by -> Nullable<Varchar>,
        accepted_at -> Timestamptz,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(quotation_items -> quotations (quotation_id));

diesel::allow_tables_to_appear_in_same_query!(
    customers,
    suppliers,
    quotations,
    quotation_items,
    sales_orders,
    purchase_orders,
    customer_acceptances,
);
