// ABOUTME: Shared test helpers building server resources and request fixtures
// ABOUTME: Provides configured ServerResources instances and CSRF request headers
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(dead_code)] // each integration test binary uses a subset of helpers

use axum::http::{HeaderMap, HeaderValue};
use forgeguard::config::{CorsConfig, Environment, ServerConfig};
use forgeguard::server::ServerResources;
use std::sync::Arc;

/// Origin on the test allow-list
pub const ALLOWED_ORIGIN: &str = "https://app.example.com";

/// Client identity used by tests
pub const CLIENT: &str = "203.0.113.9";

/// Development-environment config with one allow-listed origin
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        environment: Environment::Development,
        cors: CorsConfig {
            allowed_origins: vec![ALLOWED_ORIGIN.to_owned()],
        },
        ..ServerConfig::default()
    }
}

/// Production-environment variant of [`test_config`]
#[must_use]
pub fn production_config() -> ServerConfig {
    ServerConfig {
        environment: Environment::Production,
        ..test_config()
    }
}

/// Build shared resources from a config
#[must_use]
pub fn resources(config: ServerConfig) -> Arc<ServerResources> {
    Arc::new(ServerResources::new(config).expect("test resources must construct"))
}

/// Headers for a mutating request carrying the double-submit pair
#[must_use]
pub fn mutating_headers(
    cookie_token: &str,
    header_token: &str,
    origin: Option<&str>,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "cookie",
        HeaderValue::from_str(&format!("__Host-csrf-token={cookie_token}")).expect("cookie"),
    );
    headers.insert(
        "x-csrf-token",
        HeaderValue::from_str(header_token).expect("header token"),
    );
    if let Some(origin) = origin {
        headers.insert("origin", HeaderValue::from_str(origin).expect("origin"));
    }
    headers
}
