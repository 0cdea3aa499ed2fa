//! Fixed-point money type for the food-court backend.
//!
//! # Motivation
//!
//! All monetary amounts in this system use a 1e-2 (cents) fixed-point
//! representation stored as `i64`.  Using raw `i64` for money is error-prone:
//! it allows accidental arithmetic with unrelated integers (quantities, menu
//! ids, basis points) without any compile-time signal.
//!
//! `Cents` wraps the raw `i64` so the type system prevents:
//! - Implicit construction from raw `i64` (no `From<i64>` impl).
//! - Mixing `Cents` with unrelated `i64` values in arithmetic.
//!
//! # Scale
//!
//! 1 currency unit = 100 Cents.  All monetary values (prices, subtotals,
//! taxes, totals) use this scale.  Non-monetary quantities (item counts,
//! ids) remain plain `i64` and are never implicitly convertible.
//!
//! # Wire format
//!
//! `f64` never appears on any money path.  At the HTTP boundary amounts are
//! exchanged as fixed 2dp decimal strings ("417.90"); [`Cents`] serializes
//! to and from that form via its `Display` / `FromStr` impls.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Scale factor: 1 currency unit = 100 cents (2 decimal places).
pub const CENTS_PER_UNIT: i64 = 100;

/// Flat GST rate in basis points (5.00%).
pub const GST_RATE_BPS: i64 = 500;

// ---------------------------------------------------------------------------
// MoneyError
// ---------------------------------------------------------------------------

/// Errors returned when parsing a decimal string into [`Cents`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Input was not a decimal number of the form `123`, `123.4` or `123.45`.
    Malformed,
    /// Input carried more than two fractional digits.
    TooManyDecimals,
    /// Input would overflow `i64` after scaling by [`CENTS_PER_UNIT`].
    OutOfRange,
}

impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyError::Malformed => write!(f, "malformed decimal amount"),
            MoneyError::TooManyDecimals => {
                write!(f, "amount has more than two fractional digits")
            }
            MoneyError::OutOfRange => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for MoneyError {}

// ---------------------------------------------------------------------------
// Cents newtype
// ---------------------------------------------------------------------------

/// A fixed-point monetary amount at 1e-2 scale (cents).
///
/// 1 currency unit = `Cents(100)`.
///
/// # Construction
///
/// Use [`Cents::new`] for explicit construction from raw cents, or
/// [`Cents::from_str`] for the canonical 2dp wire form.  There is
/// intentionally no `From<i64>` implementation — callers must be deliberate
/// about when a raw integer represents money.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cents(i64);

impl Cents {
    /// Zero monetary amount.
    pub const ZERO: Cents = Cents(0);

    /// Construct from a raw cent count.
    #[inline]
    pub const fn new(raw: i64) -> Self {
        Cents(raw)
    }

    /// Extract the underlying raw cent count.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// `true` if this amount is exactly zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Multiply a per-unit price by an integer quantity.
    ///
    /// Returns `None` if the multiplication overflows `i64`.  Callers MUST
    /// handle `None` explicitly; overflow in a billing calculation is a
    /// critical error, not a routine saturation.
    ///
    /// `qty` is a plain item count (not a Cents value).
    #[inline]
    pub fn checked_mul_qty(self, qty: i64) -> Option<Cents> {
        self.0.checked_mul(qty).map(Cents)
    }

    /// Apply a tax rate given in basis points, rounding half-up to the cent.
    ///
    /// Amounts on billing paths are non-negative; negative input would bias
    /// toward zero and is rejected as `None` along with overflow.
    pub fn tax_at_bps(self, rate_bps: i64) -> Option<Cents> {
        if self.0 < 0 || rate_bps < 0 {
            return None;
        }
        let scaled = self.0.checked_mul(rate_bps)?;
        // Half-up: add half the divisor before truncating.
        Some(Cents((scaled + 5_000) / 10_000))
    }
}

impl Add for Cents {
    type Output = Cents;
    #[inline]
    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl Sub for Cents {
    type Output = Cents;
    #[inline]
    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl AddAssign for Cents {
    #[inline]
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Cents {
    #[inline]
    fn sub_assign(&mut self, rhs: Cents) {
        self.0 -= rhs.0;
    }
}

// ---------------------------------------------------------------------------
// Display / FromStr — canonical 2dp wire form
// ---------------------------------------------------------------------------

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = self.0 / CENTS_PER_UNIT;
        let frac = (self.0 % CENTS_PER_UNIT).abs();
        // When |value| < 1 unit and negative, the units part truncates to 0,
        // losing the sign.  Emit "-0" explicitly in that case.
        if self.0 < 0 && units == 0 {
            write!(f, "-{units}.{frac:02}")
        } else {
            write!(f, "{units}.{frac:02}")
        }
    }
}

impl FromStr for Cents {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MoneyError::Malformed);
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MoneyError::Malformed);
        }
        if frac_part.len() > 2 {
            return Err(MoneyError::TooManyDecimals);
        }

        let units: i64 = int_part.parse().map_err(|_| MoneyError::OutOfRange)?;
        let frac: i64 = match frac_part.len() {
            0 => 0,
            1 => frac_part.parse::<i64>().map_err(|_| MoneyError::Malformed)? * 10,
            _ => frac_part.parse().map_err(|_| MoneyError::Malformed)?,
        };

        let raw = units
            .checked_mul(CENTS_PER_UNIT)
            .and_then(|u| u.checked_add(frac))
            .ok_or(MoneyError::OutOfRange)?;
        Ok(Cents(if negative { -raw } else { raw }))
    }
}

impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Cents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_additive_identity() {
        let a = Cents::new(19_900);
        assert_eq!(a + Cents::ZERO, a);
        assert_eq!(Cents::ZERO + a, a);
    }

    #[test]
    fn add_and_sub_roundtrip() {
        let a = Cents::new(32_600);
        let b = Cents::new(1_630);
        assert_eq!((a + b) - b, a);
    }

    #[test]
    fn checked_mul_qty_normal() {
        let price = Cents::new(19_900); // 199.00
        assert_eq!(price.checked_mul_qty(2), Some(Cents::new(39_800)));
    }

    #[test]
    fn checked_mul_qty_overflow_returns_none() {
        assert_eq!(Cents::new(i64::MAX).checked_mul_qty(2), None);
    }

    #[test]
    fn gst_on_worked_example() {
        // subtotal 398.00 → tax 19.90 at 5%
        let subtotal = Cents::new(39_800);
        assert_eq!(subtotal.tax_at_bps(GST_RATE_BPS), Some(Cents::new(1_990)));
    }

    #[test]
    fn gst_rounds_half_up() {
        // 0.01 * 5% = 0.0005 → rounds up to 0.01? No: 1 cent * 500bps =
        // 0.05 cents, half-up at the cent boundary truncates to 0.
        assert_eq!(Cents::new(1).tax_at_bps(GST_RATE_BPS), Some(Cents::ZERO));
        // 10.10 * 5% = 0.505 → 0.51 (the half-cent rounds up)
        assert_eq!(
            Cents::new(1_010).tax_at_bps(GST_RATE_BPS),
            Some(Cents::new(51))
        );
        // 10.09 * 5% = 0.5045 → 0.50
        assert_eq!(
            Cents::new(1_009).tax_at_bps(GST_RATE_BPS),
            Some(Cents::new(50))
        );
    }

    #[test]
    fn tax_rejects_negative_amounts() {
        assert_eq!(Cents::new(-100).tax_at_bps(GST_RATE_BPS), None);
    }

    #[test]
    fn display_formats_two_decimal_places() {
        assert_eq!(Cents::new(41_790).to_string(), "417.90");
        assert_eq!(Cents::new(5_900).to_string(), "59.00");
        assert_eq!(Cents::new(7).to_string(), "0.07");
    }

    #[test]
    fn display_negative_below_one_unit() {
        assert_eq!(Cents::new(-75).to_string(), "-0.75");
    }

    #[test]
    fn parse_canonical_forms() {
        assert_eq!("199.00".parse::<Cents>(), Ok(Cents::new(19_900)));
        assert_eq!("59".parse::<Cents>(), Ok(Cents::new(5_900)));
        assert_eq!("0.5".parse::<Cents>(), Ok(Cents::new(50)));
        assert_eq!("-2.75".parse::<Cents>(), Ok(Cents::new(-275)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!("".parse::<Cents>(), Err(MoneyError::Malformed));
        assert_eq!("12.345".parse::<Cents>(), Err(MoneyError::TooManyDecimals));
        assert_eq!("1,99".parse::<Cents>(), Err(MoneyError::Malformed));
        assert_eq!(".99".parse::<Cents>(), Err(MoneyError::Malformed));
        assert_eq!("1.9a".parse::<Cents>(), Err(MoneyError::Malformed));
    }

    #[test]
    fn serde_roundtrips_as_string() {
        let v = Cents::new(34_230);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"342.30\"");
        let back: Cents = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
