//! Shopify shop domain type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum ShopDomainError {
    /// The input string is empty.
    #[error("shop domain cannot be empty")]
    Empty,
    /// The input is not a `*.myshopify.com` hostname.
    #[error("shop domain must end in .myshopify.com")]
    NotMyshopify,
    /// The store handle contains characters outside `[a-z0-9-]`.
    #[error("shop domain contains invalid characters")]
    InvalidCharacters,
}

/// A Shopify store's unique `*.myshopify.com` hostname.
///
/// The shop domain is the primary key for sessions and order records: every
/// authenticated request and every webhook resolves to one. Custom domains
/// (e.g. `shop.example.com`) are stored separately on the session and never
/// used as keys.
///
/// Parsing lower-cases the input, so `MY-SHOP.myshopify.com` and
/// `my-shop.myshopify.com` are the same key.
///
/// ## Examples
///
/// ```
/// use vestia_core::ShopDomain;
///
/// let shop = ShopDomain::parse("demo-store.myshopify.com")?;
/// assert_eq!(shop.as_str(), "demo-store.myshopify.com");
/// assert_eq!(shop.handle(), "demo-store");
///
/// assert!(ShopDomain::parse("example.com").is_err());
/// assert!(ShopDomain::parse("bad_store.myshopify.com").is_err());
/// # Ok::<(), vestia_core::ShopDomainError>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ShopDomain(String);

impl ShopDomain {
    const SUFFIX: &'static str = ".myshopify.com";

    /// Parse a `ShopDomain` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, does not end in
    /// `.myshopify.com`, or has a store handle with characters outside
    /// `[a-z0-9-]`.
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        if s.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        let lowered = s.trim().to_ascii_lowercase();

        let Some(handle) = lowered.strip_suffix(Self::SUFFIX) else {
            return Err(ShopDomainError::NotMyshopify);
        };

        if handle.is_empty() {
            return Err(ShopDomainError::NotMyshopify);
        }

        if !handle
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ShopDomainError::InvalidCharacters);
        }

        Ok(Self(lowered))
    }

    /// Returns the full hostname as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the store handle (the part before `.myshopify.com`).
    #[must_use]
    pub fn handle(&self) -> &str {
        self.0.strip_suffix(Self::SUFFIX).unwrap_or(&self.0)
    }

    /// Consumes the `ShopDomain` and returns the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
