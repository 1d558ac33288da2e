//! Supplier identity extracted from free-text quotation notes.
//!
//! There is no foreign key from a quotation to a supplier; the notes field
//! carries an informal `Suppliers: name1, name2` convention instead. The
//! first listed name is taken and fuzzy-matched against the supplier table.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::quotations::storage::Supplier;

pub const UNKNOWN_SUPPLIER: &str = "Unknown Supplier";

static SUPPLIER_NOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)suppliers?\s*:\s*([^\r\n]+)").unwrap());

/// First comma-separated name after a `supplier:`/`suppliers:` marker,
/// or None when the notes carry no such marker.
pub fn extract_supplier_name(notes: &str) -> Option<String> {
    let caps = SUPPLIER_NOTE.captures(notes)?;
    let first = caps.get(1)?.as_str().split(',').next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

/// Case-insensitive substring match in either direction. Advisory only:
/// an extracted name like "Acme" matches a row named "ACME CORP LTD" and
/// vice versa.
pub fn fuzzy_match<'a>(name: &str, suppliers: &'a [Supplier]) -> Option<&'a Supplier> {
    let needle = name.to_lowercase();
    suppliers.iter().find(|s| {
        let candidate = s.name.to_lowercase();
        candidate.contains(&needle) || needle.contains(&candidate)
    })
}
