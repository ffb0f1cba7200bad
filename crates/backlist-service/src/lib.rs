//! Backlist HTTP service.
//!
//! This crate provides the HTTP surface for the Backlist storefront's
//! order pipeline, including:
//!
//! - Stripe checkout webhook ingestion
//! - Product classification and fulfillment status derivation
//! - Append-only audit log reads and export
//! - Admin order updates
//!
//! # Authentication
//!
//! Admin endpoints require a compact HMAC-signed session token (bearer
//! header or `admin_session` cookie) minted by the site's login function;
//! mutating requests additionally echo the token's CSRF nonce in
//! `X-CSRF-Token`. The webhook endpoint authenticates with Stripe's
//! `Stripe-Signature` scheme instead.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for consistency

pub mod audit;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod routes;
pub mod state;
pub mod stripe;

pub use audit::{AuditLog, AuditPage, AuditQuery};
pub use auth::{sign_session_token, verify_session_token, AdminAuth, SessionClaims};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use notify::{EmailSender, NotifyError, ResendClient};
pub use routes::create_router;
pub use state::AppState;
pub use stripe::{StripeClient, StripeError};
