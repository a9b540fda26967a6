//! Response caching directives.
//!
//! Every response leaving the router passes through [`cache_control_middleware`].
//! Unless a handler attached a [`CachePolicy`] to its response extensions, the
//! response is stamped [`CachePolicy::NoStore`], so a read that follows an admin
//! write can never be answered from a browser, proxy or CDN cache.
//!
//! The only handler that opts out is the sound payload endpoint: sounds are
//! addressed by an id that is never reused or mutated in place, so their bytes
//! may be cached for a day and marked immutable.

use axum::extract::Request;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

/// One day, in seconds.
pub const IMMUTABLE_MAX_AGE: u64 = 86_400;

static CDN_CACHE_CONTROL: HeaderName = HeaderName::from_static("cdn-cache-control");
static SURROGATE_CONTROL: HeaderName = HeaderName::from_static("surrogate-control");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Never store or reuse the response anywhere.
    NoStore,
    /// Content addressed by an immutable identifier.
    Immutable { max_age: u64 },
}

impl CachePolicy {
    pub fn immutable() -> Self {
        CachePolicy::Immutable {
            max_age: IMMUTABLE_MAX_AGE,
        }
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        match self {
            CachePolicy::NoStore => {
                headers.insert(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
                );
                headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
                headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
                headers.insert(CDN_CACHE_CONTROL.clone(), HeaderValue::from_static("no-store"));
                headers.insert(SURROGATE_CONTROL.clone(), HeaderValue::from_static("no-store"));
                // Validators on an uncacheable response only invite conditional
                // requests against stale copies.
                headers.remove(header::ETAG);
                headers.remove(header::LAST_MODIFIED);
            }
            CachePolicy::Immutable { max_age } => {
                let value = format!("public, max-age={max_age}, immutable");
                if let Ok(value) = HeaderValue::from_str(&value) {
                    headers.insert(header::CACHE_CONTROL, value);
                }
                headers.remove(header::PRAGMA);
                headers.remove(header::EXPIRES);
                headers.remove(&CDN_CACHE_CONTROL);
                headers.remove(&SURROGATE_CONTROL);
            }
        }
    }
}

/// Stamp the response's cache policy. Defaults to [`CachePolicy::NoStore`].
pub async fn cache_control_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let policy = response
        .extensions()
        .get::<CachePolicy>()
        .copied()
        .filter(|_| response.status().is_success() || response.status().is_redirection())
        .unwrap_or(CachePolicy::NoStore);
    policy.apply(response.headers_mut());
    response
}
