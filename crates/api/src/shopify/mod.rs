//! Shopify Admin API client and upstream error normalization.
//!
//! # Architecture
//!
//! - GraphQL is executed as raw documents over `reqwest` with a typed
//!   response envelope - the Admin schema is not vendored, so there is no
//!   codegen step
//! - Multi-tenant: one client instance serves every installed shop; the
//!   access token comes from the shop's stored session on each call
//! - Every upstream failure is decoded exactly once, at this boundary, into
//!   [`UpstreamError`]; the retry wrapper and the response mapper only ever
//!   see that one type

mod client;
mod error;

pub use client::{
    AccessTokenResponse, CustomerSummary, Money, OrderSummary, ProductSummary, ShopPolicy,
    ShopifyClient, TrackingInfo,
};
pub use error::{GraphQLErrorResponse, GraphQLExtensions, UpstreamError, is_retryable_status};
