//! Auth service HTTP API.
//!
//! # Purpose
//! Route handler modules plus the shared error and payload types. Every
//! handler outside `/health` and `/auth/{login,exchange,validate}` goes
//! through a permission gate.
pub mod auth;
pub mod error;
pub mod openapi;
pub mod permissions;
pub mod roles;
pub mod system;
pub mod types;
pub mod users;
