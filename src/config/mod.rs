// ABOUTME: Configuration module organization for environment-driven settings
// ABOUTME: Groups deployment configuration parsed from process environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration management
//!
//! All runtime configuration is environment-driven; nothing is read from
//! files. [`environment::ServerConfig::from_env`] is the single entry point.

/// Environment-based configuration for deployment-specific settings
pub mod environment;

pub use environment::{
    CorsConfig, CsrfConfig, Environment, RateLimitSettings, ServerConfig, UpstreamUuidConfig,
};
