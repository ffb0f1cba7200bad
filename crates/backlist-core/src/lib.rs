//! Core types and logic for the Backlist storefront order pipeline.
//!
//! This crate provides the domain model shared by the store and service
//! crates:
//!
//! - **Orders**: [`Order`], [`OrderId`], [`ProductType`], [`OrderStatus`]
//! - **Status history**: [`OrderStatusHistory`] (append-only ledger)
//! - **Classification**: [`classify_product`], [`fulfillment_status`]
//! - **Audit trail**: [`AuditLogEntry`]
//!
//! All amounts are integer currency minor units (`i64` cents) to avoid
//! floating point precision issues.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod audit;
pub mod classify;
pub mod order;

pub use audit::AuditLogEntry;
pub use classify::{
    classify_product, fulfillment_status, Classification, ClassifierConfig, LineItem, MatchRule,
};
pub use order::{
    Order, OrderId, OrderStatus, OrderStatusHistory, ProductType, ProductTypeParseError,
    StatusParseError,
};
