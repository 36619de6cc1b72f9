use crate::utils::ip_extraction::extract_client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Fixed-window counter for one client
#[derive(Clone)]
struct RateLimitBucket {
    count: u32,
    reset_at: Instant,
}

impl RateLimitBucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    fn check_and_increment(&mut self, limit: u32, window: Duration) -> (bool, u32) {
        let now = Instant::now();

        // Reset if window expired
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            (true, limit.saturating_sub(self.count))
        } else {
            (false, 0)
        }
    }

    fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Sharded rate limiter to reduce lock contention
///
/// Uses multiple shards (separate HashMaps) to distribute load and reduce
/// contention on a single mutex. Keys are hashed to determine which shard to use.
pub struct HttpRateLimiter {
    shards: Vec<Mutex<HashMap<String, RateLimitBucket>>>,
    limit: u32,
    window: Duration,
    trusted_proxy_count: usize,
    max_buckets: usize, // Per shard, before eviction
}

impl HttpRateLimiter {
    /// Limiter with 16 shards
    pub fn new(limit: u32, window: Duration, trusted_proxy_count: usize) -> Self {
        Self::with_shards(limit, window, trusted_proxy_count, 16)
    }

    pub fn with_shards(
        limit: u32,
        window: Duration,
        trusted_proxy_count: usize,
        shard_count: usize,
    ) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            shards,
            limit,
            window,
            trusted_proxy_count,
            max_buckets: 10_000,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    /// Count one request for `key`. Returns the remaining allowance, or the time until
    /// the window resets when the limit is exhausted.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, Duration> {
        let shard_index = self.shard_index(key);
        let mut buckets = self.shards[shard_index].lock().await;

        if buckets.len() >= self.max_buckets {
            let now = Instant::now();
            buckets.retain(|_key, bucket| bucket.reset_at > now);

            // Still full: evict the bucket closest to expiry
            if buckets.len() >= self.max_buckets {
                let oldest_key = buckets
                    .iter()
                    .min_by_key(|(_, bucket)| bucket.reset_at)
                    .map(|(k, _)| k.clone());

                if let Some(key_to_remove) = oldest_key {
                    buckets.remove(&key_to_remove);
                    tracing::debug!(
                        removed_key = %key_to_remove,
                        shard_index,
                        remaining_buckets = buckets.len(),
                        "Evicted oldest rate limit bucket due to capacity limit"
                    );
                }
            }
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| RateLimitBucket::new(self.window));

        let (allowed, remaining) = bucket.check_and_increment(self.limit, self.window);
        if allowed {
            Ok(remaining)
        } else {
            Err(bucket.reset_in())
        }
    }

    /// Drop buckets whose window has ended
    pub async fn cleanup_expired_buckets(&self) -> usize {
        let now = Instant::now();
        let mut total_cleaned = 0;

        for shard in &self.shards {
            let mut buckets = shard.lock().await;
            let before_count = buckets.len();
            buckets.retain(|_key, bucket| bucket.reset_at > now);
            total_cleaned += before_count - buckets.len();
        }

        if total_cleaned > 0 {
            tracing::debug!(
                buckets_cleaned = total_cleaned,
                "Cleaned up expired rate limit buckets across all shards"
            );
        }

        total_cleaned
    }

    /// Periodically evict expired buckets. Stops once the limiter is dropped.
    pub fn spawn_cleanup(limiter: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(limiter);
        let period = limiter.window;

        tokio::spawn(async move {
            let mut cleanup_interval = tokio::time::interval(period);
            cleanup_interval.tick().await;

            loop {
                cleanup_interval.tick().await;
                let Some(limiter) = weak.upgrade() else {
                    break;
                };
                limiter.cleanup_expired_buckets().await;
            }
        })
    }

    fn retry_message(&self) -> String {
        let minutes = self.window.as_secs() / 60;
        let window = if minutes > 0 && self.window.as_secs() % 60 == 0 {
            format!("{} minute{}", minutes, if minutes == 1 { "" } else { "s" })
        } else {
            format!("{} seconds", self.window.as_secs())
        };
        format!(
            "Too many requests from this IP, please try again after {}.",
            window
        )
    }
}

fn insert_header(response: &mut Response, name: &'static str, value: impl ToString) {
    if let Ok(header_value) = HeaderValue::from_str(&value.to_string()) {
        response.headers_mut().insert(name, header_value);
    }
}

/// Per-IP fixed-window rate limiting
///
/// # Headers
/// - `X-RateLimit-Limit`: requests allowed per window
/// - `X-RateLimit-Remaining`: requests left in the current window
/// - `Retry-After`: seconds until the window resets (only on 429 responses)
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<HttpRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = extract_client_ip(
        request.headers(),
        socket_addr.as_ref(),
        rate_limiter.trusted_proxy_count,
    );
    let key = format!("ip:{}", ip);
    let limit = rate_limiter.limit;

    match rate_limiter.check_rate_limit(&key).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            insert_header(&mut response, "X-RateLimit-Limit", limit);
            insert_header(&mut response, "X-RateLimit-Remaining", remaining);
            response
        }
        Err(reset_in) => {
            tracing::warn!(
                client_ip = %ip,
                path = %request.uri().path(),
                limit,
                "Rate limit exceeded"
            );

            let mut response =
                (StatusCode::TOO_MANY_REQUESTS, rate_limiter.retry_message()).into_response();
            insert_header(&mut response, "X-RateLimit-Limit", limit);
            insert_header(&mut response, "X-RateLimit-Remaining", 0);
            insert_header(&mut response, "Retry-After", reset_in.as_secs().max(1));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_up_to_limit() {
        let limiter = HttpRateLimiter::new(3, Duration::from_secs(60), 0);
        assert_eq!(limiter.check_rate_limit("ip:1.1.1.1").await, Ok(2));
        assert_eq!(limiter.check_rate_limit("ip:1.1.1.1").await, Ok(1));
        assert_eq!(limiter.check_rate_limit("ip:1.1.1.1").await, Ok(0));

        let reset_in = limiter.check_rate_limit("ip:1.1.1.1").await.unwrap_err();
        assert!(reset_in <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = HttpRateLimiter::new(1, Duration::from_secs(60), 0);
        assert!(limiter.check_rate_limit("ip:1.1.1.1").await.is_ok());
        assert!(limiter.check_rate_limit("ip:1.1.1.1").await.is_err());
        assert!(limiter.check_rate_limit("ip:2.2.2.2").await.is_ok());
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = HttpRateLimiter::new(1, Duration::from_millis(50), 0);
        assert!(limiter.check_rate_limit("k").await.is_ok());
        assert!(limiter.check_rate_limit("k").await.is_err());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(limiter.check_rate_limit("k").await.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_expired_buckets() {
        let limiter = HttpRateLimiter::new(5, Duration::from_millis(20), 0);
        limiter.check_rate_limit("a").await.unwrap();
        limiter.check_rate_limit("b").await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(limiter.cleanup_expired_buckets().await, 2);
    }

    #[tokio::test]
    async fn test_eviction_at_capacity() {
        let mut limiter = HttpRateLimiter::with_shards(5, Duration::from_secs(60), 0, 1);
        limiter.max_buckets = 2;
        for key in ["a", "b", "c"] {
            limiter.check_rate_limit(key).await.unwrap();
        }
        assert_eq!(limiter.shards[0].lock().await.len(), 2);
    }

    #[test]
    fn test_retry_message() {
        let limiter = HttpRateLimiter::new(25, Duration::from_secs(15 * 60), 0);
        assert_eq!(
            limiter.retry_message(),
            "Too many requests from this IP, please try again after 15 minutes."
        );
        let limiter = HttpRateLimiter::new(25, Duration::from_secs(90), 0);
        assert!(limiter.retry_message().ends_with("after 90 seconds."));
    }
}
