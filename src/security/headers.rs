// ABOUTME: Response security headers for protection against common web vulnerabilities
// ABOUTME: Environment-aware CSP, frame, sniffing, referrer, and HSTS header configuration
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Security Headers
//!
//! Hardening headers applied to every response. Production gets the strict
//! variant (HSTS, tight CSP); development relaxes enough for local tooling.

use crate::config::Environment;
use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Security headers configuration
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    /// Content Security Policy header value
    pub csp: String,
    /// X-Frame-Options header value
    pub frame_options: String,
    /// X-Content-Type-Options header value
    pub content_type_options: String,
    /// Referrer-Policy header value
    pub referrer_policy: String,
    /// Strict-Transport-Security header value (HTTPS deployments only)
    pub hsts: Option<String>,
}

impl SecurityHeaders {
    /// Create security configuration for the given environment
    #[must_use]
    pub fn from_environment(environment: Environment) -> Self {
        if environment.is_production() {
            Self::production()
        } else {
            Self::development()
        }
    }

    /// Development-friendly configuration (no HSTS over plain HTTP)
    #[must_use]
    pub fn development() -> Self {
        Self {
            csp: "default-src 'self'; frame-ancestors 'none'; object-src 'none'; base-uri 'self';"
                .into(),
            frame_options: "DENY".into(),
            content_type_options: "nosniff".into(),
            referrer_policy: "strict-origin-when-cross-origin".into(),
            hsts: None,
        }
    }

    /// Strict production configuration
    #[must_use]
    pub fn production() -> Self {
        Self {
            csp: "default-src 'self'; frame-ancestors 'none'; object-src 'none'; base-uri 'self'; upgrade-insecure-requests;"
                .into(),
            frame_options: "DENY".into(),
            content_type_options: "nosniff".into(),
            referrer_policy: "strict-origin-when-cross-origin".into(),
            hsts: Some("max-age=31536000; includeSubDomains".into()),
        }
    }

    /// Apply the configured headers onto a response header map
    pub fn apply(&self, headers: &mut HeaderMap) {
        insert(headers, "content-security-policy", &self.csp);
        insert(headers, "x-frame-options", &self.frame_options);
        insert(headers, "x-content-type-options", &self.content_type_options);
        insert(headers, "referrer-policy", &self.referrer_policy);
        if let Some(hsts) = &self.hsts {
            insert(headers, "strict-transport-security", hsts);
        }
    }
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}
