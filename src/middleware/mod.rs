pub mod auth;
pub mod cache;
pub mod rate_limit;
