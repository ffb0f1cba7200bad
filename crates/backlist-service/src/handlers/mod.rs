//! HTTP request handlers.

pub mod audit_logs;
pub mod health;
pub mod orders;
pub mod webhooks;
