//! # Marquee Web
//!
//! Axum integration pieces shared by Marquee's HTTP surface: the
//! [`error::AppError`] type that bridges domain errors to HTTP responses.
//!
//! The error taxonomy follows the checkout workflow's needs:
//!
//! - **validation** errors (sold out, unpublished offering, bad shape) -
//!   4xx with a human-readable message, never retried
//! - **authentication** errors (webhook signature mismatch) - rejected
//!   outright before any processing
//! - **dependency** errors (gateway or store unavailable) - 5xx
//! - **lookup misses** during webhook processing are *not* errors; the
//!   handlers acknowledge them so the gateway does not retry forever

pub mod error;

pub use error::AppError;
