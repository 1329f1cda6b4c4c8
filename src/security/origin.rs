// ABOUTME: Origin and Referer provenance validation with per-route CORS profiles
// ABOUTME: Decides whether a request's claimed source is acceptable for its route and method
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Origin policy
//!
//! Two concerns live here. CORS: each route resolves to a profile (public,
//! auth, financial, default) carrying its allowed methods, headers, and
//! preflight cache duration; profile resolution is an ordered rule list so
//! precedence is explicit. Mutation provenance: state-changing methods must
//! present an allow-listed `Origin`, and a present `Referer` must match the
//! allow-list as well, because some browsers omit `Origin` but always send
//! `Referer`. A missing `Origin` on a mutating request is always rejected.

use crate::config::{CorsConfig, Environment};
use crate::errors::{AppError, AppResult};
use crate::security::events::{self, SecurityEventKind};
use axum::http::Method;

/// Route sensitivity classes, each with its own CORS posture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteProfileKind {
    /// Read-only public data: wildcard origin, no credentials
    Public,
    /// Login/registration surfaces: tight method set, credentials allowed
    Auth,
    /// Money-moving surfaces: full method set, shortest preflight cache
    Financial,
    /// Everything else
    Default,
}

/// CORS profile resolved for a route
#[derive(Debug, Clone, Copy)]
pub struct RouteProfile {
    /// Sensitivity class this profile was resolved from
    pub kind: RouteProfileKind,
    /// Methods the profile accepts
    pub allowed_methods: &'static [Method],
    /// Headers the profile accepts in preflight
    pub allowed_headers: &'static [&'static str],
    /// Whether cookies may accompany cross-origin requests
    pub allow_credentials: bool,
    /// Whether any origin is acceptable (wildcard)
    pub allow_any_origin: bool,
    /// Preflight cache duration in seconds
    pub preflight_max_age_secs: u32,
}

const COMMON_HEADERS: &[&str] = &[
    "content-type",
    "authorization",
    "accept",
    "origin",
    "x-requested-with",
    "x-csrf-token",
];

const PUBLIC_PROFILE: RouteProfile = RouteProfile {
    kind: RouteProfileKind::Public,
    allowed_methods: &[Method::GET, Method::HEAD, Method::OPTIONS],
    allowed_headers: &["content-type", "accept", "origin"],
    allow_credentials: false,
    allow_any_origin: true,
    preflight_max_age_secs: 86_400,
};

const AUTH_PROFILE: RouteProfile = RouteProfile {
    kind: RouteProfileKind::Auth,
    allowed_methods: &[Method::GET, Method::POST, Method::OPTIONS],
    allowed_headers: COMMON_HEADERS,
    allow_credentials: true,
    allow_any_origin: false,
    preflight_max_age_secs: 600,
};

const FINANCIAL_PROFILE: RouteProfile = RouteProfile {
    kind: RouteProfileKind::Financial,
    allowed_methods: &[
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ],
    allowed_headers: COMMON_HEADERS,
    allow_credentials: true,
    allow_any_origin: false,
    preflight_max_age_secs: 300,
};

const DEFAULT_PROFILE: RouteProfile = RouteProfile {
    kind: RouteProfileKind::Default,
    allowed_methods: &[
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ],
    allowed_headers: COMMON_HEADERS,
    allow_credentials: true,
    allow_any_origin: false,
    preflight_max_age_secs: 3600,
};

/// Ordered resolution rules: the first rule whose substring matches the
/// route wins. Precedence is the list order, not accident of an `if` chain.
const PROFILE_RULES: &[(&[&str], RouteProfileKind)] = &[
    (
        &["/account/", "/transaction/", "/payment/"],
        RouteProfileKind::Financial,
    ),
    (&["/login", "/register", "/auth/"], RouteProfileKind::Auth),
    (
        &["/health", "/ready", "/public/"],
        RouteProfileKind::Public,
    ),
];

/// CORS header values to apply to a response
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    /// `Access-Control-Allow-Origin` value; `None` means the header is not
    /// emitted (origin absent from the allow-list)
    pub allow_origin: Option<String>,
    /// Whether `Vary: Origin` must accompany an echoed origin
    pub vary_origin: bool,
    /// `Access-Control-Allow-Methods` value
    pub allow_methods: String,
    /// `Access-Control-Allow-Headers` value
    pub allow_headers: String,
    /// Whether `Access-Control-Allow-Credentials: true` is emitted
    pub allow_credentials: bool,
    /// `Access-Control-Max-Age` value in seconds
    pub max_age_secs: u32,
}

/// Outcome of CORS validation for a request
#[derive(Debug, Clone)]
pub enum CorsDecision {
    /// `OPTIONS` preflight: respond 204 immediately with these headers
    Preflight(CorsHeaders),
    /// Method not in the profile's allowed set: respond 405
    MethodRejected,
    /// Proceed; apply these headers to the response
    Allowed(CorsHeaders),
}

/// Environment-aware origin validation
pub struct OriginPolicy {
    environment: Environment,
    allowed_origins: Vec<String>,
}

impl OriginPolicy {
    /// Build a policy from the environment tag and configured allow-list
    #[must_use]
    pub fn new(environment: Environment, cors: &CorsConfig) -> Self {
        Self {
            environment,
            allowed_origins: cors.allowed_origins.clone(),
        }
    }

    /// Resolve the CORS profile for a route path
    #[must_use]
    pub fn resolve_profile(path: &str) -> RouteProfile {
        for (needles, kind) in PROFILE_RULES {
            if needles.iter().any(|needle| path.contains(needle)) {
                return profile_for(*kind);
            }
        }
        DEFAULT_PROFILE
    }

    /// Validate a request against its route's CORS profile.
    ///
    /// `OPTIONS` short-circuits to a preflight decision without further
    /// checks. A production request whose origin is absent from the
    /// allow-list is logged as a detection signal but NOT blocked here;
    /// blocking legitimate-but-misconfigured clients is worse than logging,
    /// and mutation provenance is enforced separately.
    #[must_use]
    pub fn validate_cors(
        &self,
        method: &Method,
        origin: Option<&str>,
        path: &str,
        client: &str,
    ) -> CorsDecision {
        let profile = Self::resolve_profile(path);

        if method == Method::OPTIONS {
            return CorsDecision::Preflight(self.headers_for(&profile, origin, client));
        }

        if !profile.allowed_methods.contains(method) {
            return CorsDecision::MethodRejected;
        }

        CorsDecision::Allowed(self.headers_for(&profile, origin, client))
    }

    /// Provenance check for state-changing methods.
    ///
    /// # Errors
    ///
    /// Returns `OriginRejected` when `Origin` is missing or outside the
    /// allow-list, or when a present `Referer` does not match it. A referer
    /// failing this check rejects the request even if `Origin` passed.
    pub fn validate_origin_for_mutation(
        &self,
        method: &Method,
        origin: Option<&str>,
        referer: Option<&str>,
    ) -> AppResult<()> {
        if !is_mutating(method) {
            return Ok(());
        }

        let Some(origin) = origin else {
            return Err(AppError::origin_rejected(
                "Origin header missing on mutating request",
            ));
        };

        if !self.origin_allowed(origin) {
            return Err(AppError::origin_rejected(format!(
                "origin {origin} not in allow-list"
            )));
        }

        if let Some(referer) = referer {
            if !self.referer_allowed(referer) {
                return Err(AppError::origin_rejected(format!(
                    "referer {referer} not in allow-list"
                )));
            }
        }

        Ok(())
    }

    /// Whether an `Origin` header value passes the environment allow-list
    #[must_use]
    pub fn origin_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        if self
            .allowed_origins
            .iter()
            .any(|allowed| allowed == origin)
        {
            return true;
        }
        // Outside production, local development servers are acceptable
        !self.environment.is_production() && is_loopback_origin(origin)
    }

    fn referer_allowed(&self, referer: &str) -> bool {
        if self.allowed_origins.iter().any(|allowed| {
            referer == allowed || referer.starts_with(&format!("{allowed}/"))
        }) {
            return true;
        }
        !self.environment.is_production() && is_loopback_origin(referer)
    }

    fn headers_for(
        &self,
        profile: &RouteProfile,
        origin: Option<&str>,
        client: &str,
    ) -> CorsHeaders {
        let (allow_origin, vary_origin) = if profile.allow_any_origin {
            (Some("*".to_owned()), false)
        } else {
            match origin {
                Some(o) if self.origin_allowed(o) => (Some(o.to_owned()), true),
                Some(o) => {
                    if self.environment.is_production() {
                        events::record(
                            SecurityEventKind::UnknownCrossOrigin,
                            client,
                            &format!("cross-origin request from {o}"),
                        );
                    }
                    (None, false)
                }
                None => (None, false),
            }
        };

        CorsHeaders {
            allow_origin,
            vary_origin,
            allow_methods: join_methods(profile.allowed_methods),
            allow_headers: profile.allowed_headers.join(", "),
            allow_credentials: profile.allow_credentials && !profile.allow_any_origin,
            max_age_secs: profile.preflight_max_age_secs,
        }
    }
}

/// Whether the method is state-changing per the double-submit contract
#[must_use]
pub fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn profile_for(kind: RouteProfileKind) -> RouteProfile {
    match kind {
        RouteProfileKind::Public => PUBLIC_PROFILE,
        RouteProfileKind::Auth => AUTH_PROFILE,
        RouteProfileKind::Financial => FINANCIAL_PROFILE,
        RouteProfileKind::Default => DEFAULT_PROFILE,
    }
}

fn join_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// True for origins/referers whose host is a local loopback
fn is_loopback_origin(value: &str) -> bool {
    let Some(rest) = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"))
    else {
        return false;
    };
    rest.split(|c: char| c == ':' || c == '/')
        .next()
        .is_some_and(|host| host == "localhost" || host == "127.0.0.1")
}
