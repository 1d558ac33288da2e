//! Customer directory: filter/paginate/search over the customer table plus
//! aggregate statistics and a detail view.

pub mod api;
pub mod validation;

pub use api::{configure_customers_api_routes, Customer};
