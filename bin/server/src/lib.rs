//! authgate web server.
//!
//! This crate provides the Axum server that puts a login gate in front of a
//! content site: session handling, the OAuth2 login round trip against a
//! Cognito hosted UI, and the access gate for non-public path prefixes.

pub mod app;
pub mod auth;
pub mod config;
pub mod negotiate;
