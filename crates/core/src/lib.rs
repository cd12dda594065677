//! Vestia Core - Shared types library.
//!
//! This crate provides common types used across all Vestia components:
//! - `api` - Widget-facing API server (routes, Shopify proxy, try-on)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for shop domains, emails, and image kinds
//! - [`classify`] - Keyword-based intent detection for chat messages

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod classify;
pub mod types;

pub use classify::{QueryType, classify};
pub use types::*;
