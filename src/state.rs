use dashmap::DashMap;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::time::Instant;

/// Per-key token bucket for rate limiting.
#[derive(Clone)]
pub struct RateLimitBucket {
    pub remaining: u32,
    pub last_refill: Instant,
}

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub admin_password_hash: Option<Arc<str>>,
    pub trust_forwarded_for: bool,
    pub rate_limits: Arc<DashMap<String, RateLimitBucket>>,
}
