// ABOUTME: Token and UUID codec turning raw entropy into wire-safe identifiers
// ABOUTME: Produces base64url CSRF tokens and RFC-4122 v4 UUIDs, validates UUID shape
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! Identifier codec
//!
//! Encodes entropy from [`SecureRandom`] into the two identifier kinds the
//! service issues: opaque CSRF tokens (32 bytes, base64url without padding,
//! safe in URLs, headers, and cookies) and canonical RFC-4122 version-4
//! UUIDs. Also provides the structural UUID check applied to every value
//! before use, including values returned by the trusted upstream service.

use crate::crypto::SecureRandom;
use crate::errors::AppResult;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use regex::Regex;
use std::sync::OnceLock;

/// CSRF token entropy in bytes (32 bytes = 256 bits)
pub const CSRF_TOKEN_LENGTH: usize = 32;

/// Canonical RFC-4122 v4 shape: `8-4-4-4-12` hex with version nibble `4`
/// and variant nibble in `[89ab]`
const UUID_V4_PATTERN: &str =
    r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$";

static UUID_V4_REGEX: OnceLock<Regex> = OnceLock::new();

fn uuid_v4_regex() -> &'static Regex {
    UUID_V4_REGEX.get_or_init(build_uuid_v4_regex)
}

#[allow(clippy::unwrap_used)] // pattern is a compile-time constant
fn build_uuid_v4_regex() -> Regex {
    Regex::new(&format!("(?i){UUID_V4_PATTERN}")).unwrap()
}

/// Encoder for CSRF tokens and v4 UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCodec {
    random: SecureRandom,
}

impl TokenCodec {
    /// Create a codec over the given random source
    #[must_use]
    pub const fn new(random: SecureRandom) -> Self {
        Self { random }
    }

    /// Generate a new CSRF token: 32 random bytes, base64url, no padding.
    ///
    /// The output alphabet is URL-, header-, and cookie-safe.
    ///
    /// # Errors
    ///
    /// Returns `RandomUnavailable` if the OS CSPRNG fails.
    pub fn csrf_token(&self) -> AppResult<String> {
        let bytes: [u8; CSRF_TOKEN_LENGTH] = self.random.bytes()?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Generate an RFC-4122 version-4 UUID from 16 random bytes.
    ///
    /// [`uuid::Builder::from_random_bytes`] sets the version (0100) and
    /// variant (10) bits over our entropy, so the fallback path carries the
    /// same guarantees as the primary one.
    ///
    /// # Errors
    ///
    /// Returns `RandomUnavailable` if the OS CSPRNG fails.
    pub fn uuid_v4(&self) -> AppResult<String> {
        let bytes: [u8; 16] = self.random.bytes()?;
        Ok(uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string())
    }

    /// Structural check that `candidate` is a canonical v4 UUID.
    ///
    /// Applied to every externally sourced value before use; a trusted
    /// upstream response is still validated here.
    #[must_use]
    pub fn is_valid_uuid(candidate: &str) -> bool {
        uuid_v4_regex().is_match(candidate)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn csrf_token_is_url_safe() {
        let codec = TokenCodec::default();
        let token = codec.csrf_token().unwrap();
        // 32 bytes -> ceil(32 * 4 / 3) = 43 chars unpadded
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn csrf_tokens_are_unique() {
        let codec = TokenCodec::default();
        let a = codec.csrf_token().unwrap();
        let b = codec.csrf_token().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_uuids_are_canonical_v4() {
        let codec = TokenCodec::default();
        for _ in 0..1000 {
            let id = codec.uuid_v4().unwrap();
            assert!(TokenCodec::is_valid_uuid(&id), "bad uuid: {id}");
        }
    }

    #[test]
    fn uuid_validation_accepts_uppercase() {
        assert!(TokenCodec::is_valid_uuid(
            "F47AC10B-58CC-4372-A567-0E02B2C3D479"
        ));
    }

    #[test]
    fn uuid_validation_rejects_malformed_values() {
        // wrong version nibble
        assert!(!TokenCodec::is_valid_uuid(
            "f47ac10b-58cc-1372-a567-0e02b2c3d479"
        ));
        // wrong variant nibble
        assert!(!TokenCodec::is_valid_uuid(
            "f47ac10b-58cc-4372-c567-0e02b2c3d479"
        ));
        // truncated
        assert!(!TokenCodec::is_valid_uuid("f47ac10b-58cc-4372-a567"));
        // trailing garbage
        assert!(!TokenCodec::is_valid_uuid(
            "f47ac10b-58cc-4372-a567-0e02b2c3d479x"
        ));
        assert!(!TokenCodec::is_valid_uuid(""));
    }
}
