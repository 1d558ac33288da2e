use crate::customers::api::{CreateCustomerRequest, UpdateCustomerRequest};
use crate::shared::error::FieldError;

pub const CUSTOMER_TYPES: &[&str] = &["Customer", "Supplier", "Both"];

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

fn is_email(value: &str) -> bool {
    let mut parts = value.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        _ => false,
    }
}

pub fn validate_create(req: &CreateCustomerRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let has_name = non_empty(&req.name)
        || non_empty(&req.customer_name)
        || non_empty(&req.company_name)
        || non_empty(&req.full_name);
    if !has_name {
        errors.push(FieldError::new(
            "name",
            "one of name, customerName, companyName or fullName is required",
        ));
    }

    match req.email.as_deref() {
        None => errors.push(FieldError::new("email", "email is required")),
        Some(email) if !is_email(email) => {
            errors.push(FieldError::new("email", "email is not valid"));
        }
        _ => {}
    }

    if let Some(customer_type) = req.customer_type.as_deref() {
        if !CUSTOMER_TYPES.contains(&customer_type) {
            errors.push(FieldError::new(
                "customerType",
                format!("must be one of: {}", CUSTOMER_TYPES.join(", ")),
            ));
        }
    }

    errors
}

pub fn validate_update(req: &UpdateCustomerRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("name", &req.name),
        ("customerName", &req.customer_name),
        ("companyName", &req.company_name),
        ("fullName", &req.full_name),
    ] {
        if value.is_some() && !non_empty(value) {
            errors.push(FieldError::new(field, "must not be empty"));
        }
    }

    if let Some(email) = req.email.as_deref() {
        if !is_email(email) {
            errors.push(FieldError::new("email", "email is not valid"));
        }
    }

    if let Some(customer_type) = req.customer_type.as_deref() {
        if !CUSTOMER_TYPES.contains(&customer_type) {
            errors.push(FieldError::new(
                "customerType",
                format!("must be one of: {}", CUSTOMER_TYPES.join(", ")),
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_a_name_source_and_email() {
        let errors = validate_create(&CreateCustomerRequest::default());
        assert!(!errors.is_empty());
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"email"));
    }

    #[test]
    fn create_accepts_any_name_candidate() {
        let req = CreateCustomerRequest {
            company_name: Some("Acme Ltd".to_string()),
            email: Some("sales@acme.example".to_string()),
            ..Default::default()
        };
        assert!(validate_create(&req).is_empty());
    }

    #[test]
    fn create_rejects_malformed_email_and_unknown_type() {
        let req = CreateCustomerRequest {
            name: Some("Acme".to_string()),
            email: Some("not-an-email".to_string()),
            customer_type: Some("Partner".to_string()),
            ..Default::default()
        };
        let errors = validate_create(&req);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"customerType"));
    }

    #[test]
    fn update_allows_partial_payloads() {
        let req = UpdateCustomerRequest {
            phone: Some("+44 20 7946 0000".to_string()),
            ..Default::default()
        };
        assert!(validate_update(&req).is_empty());
    }

    #[test]
    fn update_rejects_blank_name_fields() {
        let req = UpdateCustomerRequest {
            customer_name: Some("   ".to_string()),
            ..Default::default()
        };
        let errors = validate_update(&req);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "customerName");
    }
}
