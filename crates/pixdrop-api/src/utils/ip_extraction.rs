//! Client IP extraction
//!
//! Forwarding headers are only honoured when the service is configured to sit behind
//! trusted proxies; otherwise the socket peer address is the client.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Resolve the client IP used as the rate-limit key.
///
/// With `trusted_proxy_count == 0` headers are ignored entirely. With N trusted proxies,
/// the client is the entry just before the last N in `X-Forwarded-For`, then `X-Real-IP`
/// is tried, then the socket address. Returns `"unknown"` when nothing usable is found.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if trusted_proxy_count > 0 {
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| extract_from_forwarded_for(value, trusted_proxy_count))
        {
            return ip;
        }

        if let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| is_valid_ip(value))
        {
            return ip.to_string();
        }
    }

    if let Some(addr) = socket_addr {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// `X-Forwarded-For` is `client, proxy1, proxy2, ...`; the last `trusted_proxy_count`
/// entries were appended by our own proxies.
fn extract_from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<String> {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if ips.is_empty() {
        return None;
    }

    // Shorter chain than expected: the first hop is the best we have
    let client_ip_pos = ips.len().saturating_sub(trusted_proxy_count + 1);
    let client_ip = ips[client_ip_pos];

    is_valid_ip(client_ip).then(|| client_ip.to_string())
}

fn is_valid_ip(ip_str: &str) -> bool {
    ip_str.parse::<IpAddr>().is_ok()
}
