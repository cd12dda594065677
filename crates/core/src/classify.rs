//! Keyword-based intent detection for chat messages.
//!
//! The widget's chat box receives free-form text. Before anything reaches an
//! upstream API the message is classified into coarse intents (order status,
//! store policy, account history) by lower-cased keyword containment, and any
//! order number or email address is pulled out for direct lookup.
//!
//! Classification is a pure function of the message: no state, no model
//! calls, no multi-turn tracking. The intent flags are allowed to overlap -
//! "return my order #12" is both an order query and a policy query, and the
//! caller decides which to serve first.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::types::Email;

/// Keywords marking a message as an order/tracking question.
const ORDER_KEYWORDS: &[&str] = &[
    "order",
    "tracking",
    "track",
    "shipment",
    "shipped",
    "delivery",
    "deliver",
    "package",
    "where is my",
];

/// Keywords marking a message as a store-policy question.
const POLICY_KEYWORDS: &[&str] = &[
    "policy",
    "policies",
    "return",
    "refund",
    "exchange",
    "shipping",
    "warranty",
    "cancellation",
    "terms",
];

/// Keywords marking a message as an account/history question.
const ACCOUNT_KEYWORDS: &[&str] = &[
    "account",
    "history",
    "my orders",
    "past orders",
    "previous orders",
    "purchases",
    "profile",
];

/// Order-number patterns, tried in order; the first capture wins.
///
/// Covers `#123`, `order #123`, `order 123`, and `number #123`. No attempt is
/// made to find a "best" match among several candidates.
static ORDER_NUMBER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"#(\d+)",
        r"order\s*#?\s*(\d+)",
        r"number\s*#?\s*(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("order number pattern compiles"))
    .collect()
});

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
        .expect("email pattern compiles")
});

/// Classification of a single chat message.
///
/// Derived per message, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryType {
    /// Message asks about an order or its tracking.
    pub is_order: bool,
    /// Message asks about a store policy (returns, shipping, warranty...).
    pub is_policy: bool,
    /// Message asks about the customer's account or purchase history.
    pub is_account: bool,
    /// First order number found in the message, if any.
    pub order_number: Option<String>,
    /// First email address found in the message, if any.
    pub email: Option<Email>,
}

impl QueryType {
    /// True when no intent matched at all.
    #[must_use]
    pub const fn is_general(&self) -> bool {
        !self.is_order && !self.is_policy && !self.is_account
    }
}

/// Classify a chat message into intents and extract lookup handles.
#[must_use]
pub fn classify(message: &str) -> QueryType {
    QueryType {
        is_order: is_order_query(message),
        is_policy: is_policy_query(message),
        is_account: is_account_query(message),
        order_number: extract_order_number(message),
        email: extract_email(message),
    }
}

fn contains_any(message: &str, keywords: &[&str]) -> bool {
    let lowered = message.to_lowercase();
    keywords.iter().any(|k| lowered.contains(k))
}

/// True iff the message contains at least one order/tracking keyword.
#[must_use]
pub fn is_order_query(message: &str) -> bool {
    contains_any(message, ORDER_KEYWORDS)
}

/// True iff the message contains at least one policy keyword.
#[must_use]
pub fn is_policy_query(message: &str) -> bool {
    contains_any(message, POLICY_KEYWORDS)
}

/// True iff the message contains at least one account/history keyword.
#[must_use]
pub fn is_account_query(message: &str) -> bool {
    contains_any(message, ACCOUNT_KEYWORDS)
}

/// Extract the first order number from the message.
///
/// Patterns are tried in listed order and the first successful numeric
/// capture is returned as-is (digits only, `#` stripped).
#[must_use]
pub fn extract_order_number(message: &str) -> Option<String> {
    let lowered = message.to_lowercase();
    ORDER_NUMBER_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(&lowered)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_owned())
    })
}

/// Extract the first email-shaped substring from the message.
///
/// The pattern is deliberately loose (RFC-5322-ish); [`Email::parse`] applies
/// the structural checks afterwards.
#[must_use]
pub fn extract_email(message: &str) -> Option<Email> {
    EMAIL_PATTERN
        .find(message)
        .and_then(|m| Email::parse(m.as_str()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_message_containing_order_is_an_order_query() {
        for msg in [
            "where is my order?",
            "ORDER status please",
            "I want to reorder",
            "my Order #55 hasn't arrived",
        ] {
            assert!(is_order_query(msg), "{msg:?} should be an order query");
        }
        assert!(!is_order_query("do you sell hats?"));
    }

    #[test]
    fn policy_and_account_keywords_match_independently() {
        assert!(is_policy_query("what's your return policy?"));
        assert!(is_policy_query("how long does shipping take"));
        assert!(!is_policy_query("hello there"));

        assert!(is_account_query("show my past orders"));
        assert!(is_account_query("update my account"));
        assert!(!is_account_query("where's my package"));
    }

    #[test]
    fn intents_may_overlap() {
        let query = classify("I want to return my order #12");
        assert!(query.is_order);
        assert!(query.is_policy);
        assert!(!query.is_account);
        assert_eq!(query.order_number.as_deref(), Some("12"));
    }

    #[test]
    fn extracts_order_numbers_first_pattern_wins() {
        assert_eq!(extract_order_number("order #1042").as_deref(), Some("1042"));
        assert_eq!(extract_order_number("#77").as_deref(), Some("77"));
        assert_eq!(extract_order_number("order 123").as_deref(), Some("123"));
        assert_eq!(extract_order_number("number #9").as_deref(), Some("9"));
        // `#55` matches the hash pattern before `order 123` gets a chance
        assert_eq!(
            extract_order_number("order 123 or was it #55").as_deref(),
            Some("55")
        );
        assert_eq!(extract_order_number("no numbers here"), None);
    }

    #[test]
    fn extracts_the_first_email() {
        let email = extract_email("contact me at a@b.com please").expect("email");
        assert_eq!(email.as_str(), "a@b.com");

        let first = extract_email("a@b.com or c@d.com").expect("email");
        assert_eq!(first.as_str(), "a@b.com");

        assert_eq!(extract_email("no address here"), None);
    }

    #[test]
    fn general_messages_have_no_flags() {
        let query = classify("do you have this in blue?");
        assert!(query.is_general());
        assert_eq!(query.order_number, None);
        assert_eq!(query.email, None);
    }
}
