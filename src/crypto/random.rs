// ABOUTME: Cryptographically secure random byte generation with fail-closed semantics
// ABOUTME: Wraps the OS CSPRNG; unavailability is a fatal error, never a silent downgrade
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! Secure random source
//!
//! Thin wrapper over [`rand::rngs::OsRng`]. If the OS CSPRNG cannot produce
//! bytes the caller gets [`crate::errors::ErrorCode::RandomUnavailable`] and
//! the service fails closed. There is deliberately no non-cryptographic
//! fallback anywhere in this crate.

use crate::errors::{AppError, AppResult};
use rand::rngs::OsRng;
use rand::RngCore;

/// Cryptographically secure random source backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureRandom;

impl SecureRandom {
    /// Create a new secure random source
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Fill `buf` with cryptographically secure random bytes.
    ///
    /// # Errors
    ///
    /// Returns `RandomUnavailable` if the OS CSPRNG fails. Callers must
    /// propagate this; masking it would silently weaken every identifier
    /// issued afterwards.
    pub fn fill(self, buf: &mut [u8]) -> AppResult<()> {
        OsRng.try_fill_bytes(buf).map_err(|e| {
            tracing::error!(error = %e, "OS CSPRNG unavailable, failing closed");
            AppError::random_unavailable(format!("OS random generator failed: {e}"))
        })
    }

    /// Draw a fixed-size array of random bytes.
    ///
    /// # Errors
    ///
    /// Returns `RandomUnavailable` if the OS CSPRNG fails.
    pub fn bytes<const N: usize>(self) -> AppResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn fills_requested_length() {
        let mut buf = [0u8; 64];
        SecureRandom::new().fill(&mut buf).unwrap();
        // 64 zero bytes from a working CSPRNG is a 2^-512 event
        assert!(buf.iter().any(|&b| b != 0));
    }

    #[test]
    fn independent_draws_differ() {
        let a: [u8; 32] = SecureRandom::new().bytes().unwrap();
        let b: [u8; 32] = SecureRandom::new().bytes().unwrap();
        assert_ne!(a, b);
    }
}
