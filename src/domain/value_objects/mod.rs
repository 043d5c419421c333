//! Value Objects for the storefront

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rupee amount, never negative, kept at two decimal places.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Result<Self, ValueError> {
        if amount.is_sign_negative() && !amount.is_zero() { return Err(ValueError::NegativeAmount); }
        Ok(Self(round2(amount)))
    }

    /// Whole rupees, for literals in code and tests.
    pub fn rupees(amount: u32) -> Self { Self(Decimal::from(amount)) }

    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    pub fn add(&self, other: Money) -> Money { Money(self.0 + other.0) }
    pub fn multiply(&self, qty: u32) -> Money { Money(round2(self.0 * Decimal::from(qty))) }

    /// Saturates at zero.
    pub fn subtract(&self, other: Money) -> Money {
        if other.0 >= self.0 { Money::ZERO } else { Money(self.0 - other.0) }
    }

    /// The discount amount for `pct` percent of this value.
    pub fn percent_off(&self, pct: u8) -> Money {
        Money(round2(self.0 * Decimal::from(pct) / Decimal::ONE_HUNDRED))
    }

    /// Integer paise, as payment gateways expect.
    pub fn to_paise(&self) -> i64 {
        (self.0 * Decimal::ONE_HUNDRED).trunc().to_i64().unwrap_or(i64::MAX)
    }
}

fn round2(d: Decimal) -> Decimal { d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero) }

impl TryFrom<Decimal> for Money {
    type Error = ValueError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Money::new(value) }
}

impl From<Money> for Decimal {
    fn from(m: Money) -> Self { m.0 }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "₹{:.2}", self.0) }
}

/// URL-safe identifier derived from a display name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn from_name(name: &str) -> Result<Self, ValueError> {
        let mut out = String::with_capacity(name.len());
        let mut dash = false;
        for c in name.trim().chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
                dash = false;
            } else if !dash && !out.is_empty() {
                out.push('-');
                dash = true;
            }
        }
        while out.ends_with('-') { out.pop(); }
        if out.is_empty() { return Err(ValueError::EmptySlug); }
        Ok(Self(out))
    }

    /// Accepts an already-normalized slug, as stored.
    pub fn parse(value: &str) -> Result<Self, ValueError> {
        let slug = Self::from_name(value)?;
        if slug.0 != value { return Err(ValueError::InvalidSlug(value.to_string())); }
        Ok(slug)
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Ten-digit Indian mobile number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    pub fn parse(raw: &str) -> Result<Self, ValueError> {
        let compact: String = raw.chars().filter(|c| !matches!(c, ' ' | '-' | '(' | ')')).collect();
        let digits = compact.strip_prefix('+').unwrap_or(&compact);
        let local = match digits.len() {
            12 if digits.starts_with("91") => &digits[2..],
            11 if digits.starts_with('0') => &digits[1..],
            _ => digits,
        };
        let valid = local.len() == 10
            && local.bytes().all(|b| b.is_ascii_digit())
            && matches!(local.as_bytes()[0], b'6'..=b'9');
        if !valid { return Err(ValueError::InvalidPhone(raw.to_string())); }
        Ok(Self(local.to_string()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Phone {
    type Error = ValueError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Phone::parse(&value) }
}

impl From<Phone> for String {
    fn from(p: Phone) -> Self { p.0 }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "+91{}", self.0) }
}

/// Review score between 1 and 5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if !(1..=5).contains(&value) { return Err(ValueError::RatingOutOfRange(value)); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u8 { self.0 }
}

impl TryFrom<u8> for Rating {
    type Error = ValueError;
    fn try_from(value: u8) -> Result<Self, Self::Error> { Rating::new(value) }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> Self { r.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError { NegativeAmount, EmptySlug, InvalidSlug(String), InvalidPhone(String), RatingOutOfRange(u8) }
impl std::error::Error for ValueError {}
impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeAmount => write!(f, "amount cannot be negative"),
            Self::EmptySlug => write!(f, "name has no characters usable in a slug"),
            Self::InvalidSlug(s) => write!(f, "invalid slug: {s}"),
            Self::InvalidPhone(p) => write!(f, "invalid mobile number: {p}"),
            Self::RatingOutOfRange(r) => write!(f, "rating must be between 1 and 5, got {r}"),
        }
    }
}

/// `validator` check for free text that must contain something besides whitespace.
pub fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut e = validator::ValidationError::new("blank");
        e.message = Some("must not be blank".into());
        return Err(e);
    }
    Ok(())
}
