//! Clients for non-Shopify external services.

pub mod tryon;

pub use tryon::TryOnClient;
