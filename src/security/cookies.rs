// ABOUTME: Cookie header parsing for extracting named cookie values
// ABOUTME: Used by the CSRF guard to read the double-submit cookie token
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cookie parsing helpers

use axum::http::HeaderMap;

/// Extract a named cookie's value from the `Cookie` request header.
///
/// Handles multiple `name=value` pairs separated by `;`. Returns the first
/// match; a well-behaved client never sends duplicates for our cookies.
#[must_use]
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get("cookie")?.to_str().ok()?;
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name {
            Some(value.to_owned())
        } else {
            None
        }
    })
}
