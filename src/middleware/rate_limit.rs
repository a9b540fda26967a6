use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::error::AppError;
use crate::state::{AppState, RateLimitBucket};

/// Login attempts allowed per window.
pub const CAPACITY: u32 = 10;
/// Window duration in seconds; tokens refill fully after this period.
const WINDOW_SECS: u64 = 60;
/// Bucket count above which idle buckets are dropped.
const PRUNE_THRESHOLD: usize = 1024;

/// Token-bucket limiter for credential endpoints, keyed by the client address.
///
/// The address is the TCP peer. `X-Forwarded-For` is only consulted when the
/// server is configured to trust a reverse proxy.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(&req, state.trust_forwarded_for);
    let now = Instant::now();

    if state.rate_limits.len() >= PRUNE_THRESHOLD {
        prune_idle(&state.rate_limits, now);
    }

    let (remaining, retry_after) = {
        let mut entry = state
            .rate_limits
            .entry(key)
            .or_insert_with(|| RateLimitBucket {
                remaining: CAPACITY,
                last_refill: now,
            });

        let bucket = entry.value_mut();

        // Refill tokens based on elapsed time
        let elapsed = now.duration_since(bucket.last_refill).as_secs();
        if elapsed >= WINDOW_SECS {
            bucket.remaining = CAPACITY;
            bucket.last_refill = now;
        } else if elapsed > 0 {
            let refill = (elapsed * u64::from(CAPACITY) / WINDOW_SECS) as u32;
            if refill > 0 {
                bucket.remaining = (bucket.remaining + refill).min(CAPACITY);
                bucket.last_refill = now;
            }
        }

        if bucket.remaining == 0 {
            let secs_until_refill =
                WINDOW_SECS.saturating_sub(now.duration_since(bucket.last_refill).as_secs());
            (0u32, Some(secs_until_refill.max(1)))
        } else {
            bucket.remaining -= 1;
            (bucket.remaining, None)
        }
    };

    if let Some(retry_after) = retry_after {
        tracing::warn!("login rate limit hit, retry after {retry_after}s");
        return AppError::RateLimited { retry_after }.into_response();
    }

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(CAPACITY));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
    response
}

fn client_key(req: &Request, trust_forwarded_for: bool) -> String {
    let forwarded = trust_forwarded_for
        .then(|| {
            req.headers()
                .get("X-Forwarded-For")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|addr| !addr.is_empty())
                .map(str::to_string)
        })
        .flatten();

    let addr = forwarded.or_else(|| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(peer)| peer.ip().to_string())
    });

    match addr {
        Some(addr) => {
            let mut hasher = Sha256::new();
            hasher.update(addr.as_bytes());
            format!("ip:{:x}", hasher.finalize())
        }
        // Only reachable when the router is served without connect info.
        None => "unknown".to_string(),
    }
}

/// Drop buckets idle for a whole window. They would be back at full capacity,
/// so forgetting them changes nothing.
fn prune_idle(buckets: &DashMap<String, RateLimitBucket>, now: Instant) {
    let before = buckets.len();
    buckets.retain(|_, bucket| now.duration_since(bucket.last_refill).as_secs() < WINDOW_SECS);
    tracing::debug!(
        pruned = before.saturating_sub(buckets.len()),
        "pruned idle rate-limit buckets"
    );
}
