//! Core types for Vestia.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod image;
pub mod shop;

pub use email::{Email, EmailError};
pub use image::{ImageKind, ImageKindError};
pub use shop::{ShopDomain, ShopDomainError};
