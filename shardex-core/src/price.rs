//! Exact decimal prices.
//!
//! A [`Price`] is an integer count of atomic units with [`PRICE_DECIMALS`]
//! fractional digits, so `"0.01"` and `"0.010"` are the same value and
//! comparisons never go through floating point.

use serde::de::{Error as DeError, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of fractional decimal digits a price can carry.
pub const PRICE_DECIMALS: u32 = 18;

const SCALE: u128 = 10u128.pow(PRICE_DECIMALS);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("price is empty")]
    Empty,
    #[error("price `{0}` is not a plain non-negative decimal")]
    Invalid(String),
    #[error("price `{0}` has more than {PRICE_DECIMALS} fractional digits")]
    TooPrecise(String),
    #[error("price `{0}` is out of range")]
    Overflow(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(u128);

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_atomic(units: u128) -> Self {
        Self(units)
    }

    pub fn atomic_units(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(PriceError::Empty);
        }
        let (whole, frac) = match raw.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (raw, ""),
        };
        let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty()
            || !digits_only(whole)
            || !digits_only(frac)
            || (raw.contains('.') && frac.is_empty())
        {
            return Err(PriceError::Invalid(raw.to_string()));
        }
        if frac.len() > PRICE_DECIMALS as usize {
            return Err(PriceError::TooPrecise(raw.to_string()));
        }

        let overflow = || PriceError::Overflow(raw.to_string());
        let whole_units = whole
            .parse::<u128>()
            .map_err(|_| overflow())?
            .checked_mul(SCALE)
            .ok_or_else(overflow)?;
        let frac_units = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<width$}", width = PRICE_DECIMALS as usize);
            padded.parse::<u128>().map_err(|_| overflow())?
        };
        whole_units
            .checked_add(frac_units)
            .map(Price)
            .ok_or_else(overflow)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE;
        let frac = self.0 % SCALE;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{frac:0>width$}", width = PRICE_DECIMALS as usize);
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PriceVisitor;

        impl Visitor<'_> for PriceVisitor {
            type Value = Price;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a non-negative decimal price string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: DeError,
            {
                Price::from_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(PriceVisitor)
    }
}
