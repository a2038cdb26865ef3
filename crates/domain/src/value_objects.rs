//! Value objects for the listing domain.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Minimum listing price in yen.
pub const MIN_PRICE_YEN: i64 = 1;

/// Maximum listing price in yen.
pub const MAX_PRICE_YEN: i64 = 1_000_000;

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// A listing price in whole yen.
///
/// Yen has no minor unit, so the amount is a plain integer. The
/// constructor enforces the engine-wide 1..=1_000_000 bound; a `Price`
/// that exists is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// Creates a price, rejecting amounts outside the allowed range.
    pub fn new(yen: i64) -> Result<Self, DomainError> {
        if !(MIN_PRICE_YEN..=MAX_PRICE_YEN).contains(&yen) {
            return Err(DomainError::InvalidPrice { yen });
        }
        Ok(Self(yen))
    }

    /// Returns the amount in yen.
    pub fn yen(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A listing description, bounded at 500 characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Description(String);

impl Description {
    /// Creates a description, rejecting text over the bound.
    ///
    /// The bound counts characters, not bytes, matching what the input
    /// form enforces for Japanese text.
    pub fn new(text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();
        let len = text.chars().count();
        if len > MAX_DESCRIPTION_CHARS {
            return Err(DomainError::DescriptionTooLong { len });
        }
        Ok(Self(text))
    }

    /// Returns an empty description.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Returns the description text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Description {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
