pub mod api_key;
pub mod jwt;
pub mod middleware;
pub mod models;
