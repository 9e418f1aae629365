//! Core types and utilities for authgate.
//!
//! This crate provides the result alias used for layered error reports and
//! the opaque session token carried in the session cookie.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseTokenError, SessionToken};
