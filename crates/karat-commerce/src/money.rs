//! Money and weight types.
//!
//! Both are fixed-point integers: money in the smallest currency unit
//! (paise for INR, cents for USD) and weight in milligrams. Nothing in the
//! pricing path goes through binary floating point except the conversion of
//! an external spot quote, which is rounded once on the way in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
    AED,
}

impl Currency {
    /// Get the currency code (e.g., "INR").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::AED => "AED",
        }
    }

    /// Get the currency symbol (e.g., "₹").
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::INR => "\u{20b9}",
            Currency::USD => "$",
            Currency::EUR => "\u{20ac}",
            Currency::GBP => "\u{00a3}",
            Currency::AED => "AED ",
        }
    }

    /// Get the number of decimal places for this currency.
    pub fn decimal_places(&self) -> u32 {
        2
    }

    /// Parse a currency code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "INR" => Some(Currency::INR),
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "AED" => Some(Currency::AED),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary value with currency.
///
/// Amounts are stored in the smallest unit of the currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in smallest currency unit.
    pub amount_minor: i64,
    /// The currency.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money value from minor units.
    pub fn new(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    /// Create a Money value from a decimal amount, rounding to the minor unit.
    ///
    /// ```
    /// use karat_commerce::money::{Money, Currency};
    /// let price = Money::from_decimal(49.99, Currency::INR);
    /// assert_eq!(price.amount_minor, 4999);
    /// ```
    pub fn from_decimal(amount: f64, currency: Currency) -> Self {
        let multiplier = 10_i64.pow(currency.decimal_places());
        let amount_minor = (amount * multiplier as f64).round() as i64;
        Self::new(amount_minor, currency)
    }

    /// Parse a decimal string such as `"1250.5"` without going through floats.
    ///
    /// Digits beyond the currency's precision are rounded half away from zero.
    pub fn parse_decimal(raw: &str, currency: Currency) -> Option<Self> {
        let raw = raw.trim();
        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };
        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return None;
        }

        let places = currency.decimal_places() as usize;
        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut minor = whole.checked_mul(10_i64.pow(places as u32))?;

        let kept: String = fraction.chars().take(places).collect();
        let kept = format!("{:0<width$}", kept, width = places);
        if places > 0 {
            minor = minor.checked_add(kept.parse::<i64>().ok()?)?;
        }
        if let Some(next) = fraction.chars().nth(places) {
            if next >= '5' {
                minor = minor.checked_add(1)?;
            }
        }

        Some(Self::new(if negative { -minor } else { minor }, currency))
    }

    /// Create a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    /// Check if this is negative.
    pub fn is_negative(&self) -> bool {
        self.amount_minor < 0
    }

    /// Convert to a decimal value.
    pub fn to_decimal(&self) -> f64 {
        let divisor = 10_i64.pow(self.currency.decimal_places());
        self.amount_minor as f64 / divisor as f64
    }

    /// Format as a display string (e.g., "₹49.99").
    pub fn display(&self) -> String {
        format!("{}{}", self.currency.symbol(), self.display_amount())
    }

    /// Format as a display string without symbol (e.g., "49.99").
    ///
    /// Formatting is done on the integer amount so large values never pick
    /// up float noise.
    pub fn display_amount(&self) -> String {
        let places = self.currency.decimal_places();
        let divisor = 10_i64.pow(places);
        let sign = if self.amount_minor < 0 { "-" } else { "" };
        let abs = self.amount_minor.unsigned_abs();
        format!(
            "{}{}.{:0width$}",
            sign,
            abs / divisor as u64,
            abs % divisor as u64,
            width = places as usize
        )
    }

    /// Try to add another Money value, returning None on currency mismatch or overflow.
    pub fn try_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        Some(Money::new(
            self.amount_minor.checked_add(other.amount_minor)?,
            self.currency,
        ))
    }

    /// Try to subtract another Money value.
    pub fn try_subtract(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        Some(Money::new(
            self.amount_minor.checked_sub(other.amount_minor)?,
            self.currency,
        ))
    }

    /// Multiply by an integer factor, returning None on overflow.
    pub fn try_multiply(&self, factor: i64) -> Option<Money> {
        Some(Money::new(
            self.amount_minor.checked_mul(factor)?,
            self.currency,
        ))
    }

    /// Treat `self` as a rate per gram and price `quantity` pieces of `weight`.
    ///
    /// Computed in 128-bit milligram units and rounded half away from zero
    /// to the minor unit.
    pub fn per_gram_times(&self, weight: Weight, quantity: i64) -> Option<Money> {
        let numerator = (self.amount_minor as i128)
            .checked_mul(weight.milligrams as i128)?
            .checked_mul(quantity as i128)?;
        let denominator = Weight::MILLIGRAMS_PER_GRAM as i128;
        let half = denominator / 2;
        let rounded = if numerator >= 0 {
            (numerator + half) / denominator
        } else {
            (numerator - half) / denominator
        };
        let amount_minor = i64::try_from(rounded).ok()?;
        Some(Money::new(amount_minor, self.currency))
    }

    /// Sum an iterator of Money values, returning None on mismatch or overflow.
    pub fn try_sum<'a>(mut iter: impl Iterator<Item = &'a Money>, currency: Currency) -> Option<Money> {
        iter.try_fold(Money::zero(currency), |acc, m| acc.try_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// A weight in milligrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Weight {
    pub milligrams: i64,
}

impl Weight {
    pub const MILLIGRAMS_PER_GRAM: i64 = 1000;

    pub fn from_milligrams(milligrams: i64) -> Self {
        Self { milligrams }
    }

    /// Create a weight from grams, rounding to the nearest milligram.
    pub fn from_grams(grams: f64) -> Self {
        Self::from_milligrams((grams * Self::MILLIGRAMS_PER_GRAM as f64).round() as i64)
    }

    pub fn to_grams(&self) -> f64 {
        self.milligrams as f64 / Self::MILLIGRAMS_PER_GRAM as f64
    }

    pub fn is_zero(&self) -> bool {
        self.milligrams == 0
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}g", self.to_grams())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_decimal() {
        let m = Money::from_decimal(49.99, Currency::INR);
        assert_eq!(m.amount_minor, 4999);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(Money::parse_decimal("1250.5", Currency::INR).unwrap().amount_minor, 125050);
        assert_eq!(Money::parse_decimal("0.005", Currency::INR).unwrap().amount_minor, 1);
        assert_eq!(Money::parse_decimal("-3", Currency::INR).unwrap().amount_minor, -300);
        assert_eq!(Money::parse_decimal(".75", Currency::INR).unwrap().amount_minor, 75);
        assert!(Money::parse_decimal("", Currency::INR).is_none());
        assert!(Money::parse_decimal("12a", Currency::INR).is_none());
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(4999, Currency::INR).display(), "\u{20b9}49.99");
        assert_eq!(Money::new(-5, Currency::USD).display_amount(), "-0.05");
        assert_eq!(Money::new(3_027_000, Currency::INR).display_amount(), "30270.00");
    }

    #[test]
    fn test_try_add_rejects_currency_mismatch() {
        let inr = Money::new(1000, Currency::INR);
        let usd = Money::new(1000, Currency::USD);
        assert!(inr.try_add(&usd).is_none());
        assert_eq!(inr.try_add(&inr).unwrap().amount_minor, 2000);
    }

    #[test]
    fn test_try_multiply_overflow() {
        assert!(Money::new(i64::MAX, Currency::INR).try_multiply(2).is_none());
    }

    #[test]
    fn test_per_gram_times() {
        let rate = Money::from_decimal(6000.0, Currency::INR);
        let cost = rate.per_gram_times(Weight::from_grams(5.0), 1).unwrap();
        assert_eq!(cost.amount_minor, 3_000_000);

        // 70.00/g * 0.333g * 3 = 69.93
        let rate = Money::from_decimal(70.0, Currency::INR);
        let cost = rate.per_gram_times(Weight::from_milligrams(333), 3).unwrap();
        assert_eq!(cost.amount_minor, 6993);
    }

    #[test]
    fn test_try_sum() {
        let values = [Money::new(100, Currency::INR), Money::new(250, Currency::INR)];
        assert_eq!(Money::try_sum(values.iter(), Currency::INR).unwrap().amount_minor, 350);
    }

    #[test]
    fn test_weight_from_grams() {
        assert_eq!(Weight::from_grams(2.5).milligrams, 2500);
        assert!((Weight::from_milligrams(1250).to_grams() - 1.25).abs() < 1e-9);
    }
}
