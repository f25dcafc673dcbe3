//! Auth service library crate.
//!
//! # Purpose
//! Exposes the HTTP API, credential lifecycle, configuration and RBAC storage
//! backends for use by the binary and integration tests.
pub mod api;
pub mod app;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod model;
pub mod observability;
pub mod store;
