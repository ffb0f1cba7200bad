//! Admin authentication guard.
//!
//! Admin requests carry a compact signed session token: three base64url
//! (no padding) parts, `header.payload.signature`, with an HMAC-SHA256
//! signature over `header.payload` using the process-wide session secret.
//! The payload carries `scope` (must be `admin`), `exp` (unix seconds),
//! `csrf` (anti-forgery nonce) and optionally `sub` (actor identity).
//!
//! CSRF protection is bound to the session without server-side storage:
//! any state-changing request must echo the token's embedded `csrf` value
//! in an `X-CSRF-Token` header.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::Method;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::{constant_time_eq, hmac_sha256_b64url};
use crate::error::ApiError;
use crate::state::AppState;

/// Name of the session cookie set by the site's login function.
pub const SESSION_COOKIE: &str = "admin_session";

/// Header carrying the CSRF echo for mutating requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Claims carried by the session token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Token scope; only `"admin"` is accepted.
    pub scope: String,

    /// Expiry, unix seconds. Tokens without an expiry never expire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Anti-forgery nonce, echoed by the client on mutating requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf: Option<String>,

    /// Actor identity, recorded in audit entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

/// A verified admin session, extracted from the request.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Actor identity for audit entries (`sub` claim, default "admin").
    pub actor: String,

    /// The verified claims.
    pub claims: SessionClaims,
}

impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let secret = state
                .config
                .session_secret
                .as_ref()
                .ok_or(ApiError::AuthenticationRequired)?;

            let token =
                extract_token(parts).ok_or(ApiError::AuthenticationRequired)?;

            let claims =
                verify_session_token(secret, &token, chrono::Utc::now().timestamp())?;

            // CSRF applies to anything that mutates state. Read-only
            // methods pass without the header.
            if requires_csrf(&parts.method) {
                let supplied = parts
                    .headers
                    .get(CSRF_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .ok_or(ApiError::CsrfValidationFailed)?;
                let embedded = claims
                    .csrf
                    .as_deref()
                    .ok_or(ApiError::CsrfValidationFailed)?;
                if !constant_time_eq(supplied, embedded) {
                    return Err(ApiError::CsrfValidationFailed);
                }
            }

            let actor = claims.sub.clone().unwrap_or_else(|| "admin".to_string());
            Ok(AdminAuth { actor, claims })
        })
    }
}

fn requires_csrf(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Pull the token from `Authorization: Bearer ...` or the session cookie.
fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(bearer) = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(bearer.to_string());
    }

    parts
        .headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                let (name, value) = cookie.trim().split_once('=')?;
                (name == SESSION_COOKIE).then(|| value.to_string())
            })
        })
}

/// Verify a compact session token and return its claims.
///
/// # Errors
///
/// - `InvalidSignature` for structural problems or a signature mismatch
/// - `Expired` when `exp` is in the past
/// - `InvalidScope` when `scope` is not `"admin"`
pub fn verify_session_token(
    secret: &str,
    token: &str,
    now_unix: i64,
) -> Result<SessionClaims, ApiError> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ApiError::InvalidSignature);
    };

    let expected = hmac_sha256_b64url(secret, format!("{header}.{payload}").as_bytes());
    if !constant_time_eq(&expected, signature) {
        return Err(ApiError::InvalidSignature);
    }

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| ApiError::InvalidSignature)?;
    let claims: SessionClaims =
        serde_json::from_slice(&payload_bytes).map_err(|_| ApiError::InvalidSignature)?;

    if let Some(exp) = claims.exp {
        if exp < now_unix {
            return Err(ApiError::Expired);
        }
    }

    if claims.scope != "admin" {
        return Err(ApiError::InvalidScope);
    }

    Ok(claims)
}

/// Mint a session token for the given claims.
///
/// The site's login function is the production caller; the test suite uses
/// it to fabricate sessions.
#[must_use]
pub fn sign_session_token(secret: &str, claims: &SessionClaims) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"session"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(claims).expect("session claims serialize to JSON"),
    );
    let signature = hmac_sha256_b64url(secret, format!("{header}.{payload}").as_bytes());
    format!("{header}.{payload}.{signature}")
}
