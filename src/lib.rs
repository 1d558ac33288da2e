pub mod api_router;
pub mod config;
pub mod customers;
pub mod quotations;
pub mod shared;
