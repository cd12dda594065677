//! Vestia API library.
//!
//! This crate provides the widget API as a library, allowing it to be
//! tested and reused by the CLI and integration tests.
//!
//! # Security
//!
//! This crate handles per-shop Admin API tokens. Tokens are wrapped in
//! `secrecy::SecretString`, redacted from `Debug` output, and never included
//! in client-facing responses.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod retry;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;
