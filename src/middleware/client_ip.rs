// ABOUTME: Client IP extraction from forwarded headers or the socket peer address
// ABOUTME: Produces the client identity used for rate-limit keying and security logs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client identity extraction

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Extract the client IP from headers or the remote address.
///
/// Priority: `X-Forwarded-For` (first entry) > `X-Real-IP` > peer address.
/// Falls back to `"unknown"` so rate limiting still applies (all unknown
/// clients share one budget rather than bypassing the limiter).
#[must_use]
pub fn extract_client_ip(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> String {
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        // X-Forwarded-For can contain multiple IPs, take the first one
        if let Some(first) = xff.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return trimmed.to_owned();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        let trimmed = real_ip.trim();
        if !trimmed.is_empty() {
            return trimmed.to_owned();
        }
    }

    remote_addr.map_or_else(|| "unknown".to_owned(), |addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));

        assert_eq!(extract_client_ip(&headers, None), "203.0.113.9");
    }

    #[test]
    fn real_ip_is_second_choice() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));

        assert_eq!(extract_client_ip(&headers, None), "10.0.0.2");
    }

    #[test]
    fn peer_address_is_last_resort() {
        let addr: SocketAddr = "198.51.100.4:443".parse().unwrap();
        assert_eq!(
            extract_client_ip(&HeaderMap::new(), Some(addr)),
            "198.51.100.4"
        );
        assert_eq!(extract_client_ip(&HeaderMap::new(), None), "unknown");
    }
}
