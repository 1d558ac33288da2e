//! Quotations enriched with resolved customer and supplier identity.
//!
//! Supplier identity on the list path is note-derived: there is no supplier
//! foreign key, so the notes text is matched against the supplier table. The
//! single-record fetch resolves its flat supplier name through the
//! quotation's own customer reference instead.

pub mod api;
pub mod storage;
pub mod supplier_match;

pub use api::configure_quotations_api_routes;
