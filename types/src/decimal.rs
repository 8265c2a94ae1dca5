//! Exact fixed-point decimals for governed numeric parameters.
//!
//! Values such as a base TPS fee of `100.3` must survive voting, tallying,
//! storage and activation without any floating-point drift, and two nodes must
//! agree on their byte representation. A `Decimal` is therefore kept as an
//! integer mantissa plus a decimal scale, always normalized so that equal
//! numbers have exactly one representation.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A non-negative exact decimal: `mantissa / 10^scale`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: u128,
    scale: u8,
}

impl Decimal {
    /// Maximum number of fractional digits.
    pub const MAX_SCALE: u8 = 18;

    /// Largest number of significant digits that always fits a `u128`.
    const MAX_DIGITS: usize = 38;

    pub const ZERO: Self = Self {
        mantissa: 0,
        scale: 0,
    };

    pub fn from_integer(value: u128) -> Self {
        Self {
            mantissa: value,
            scale: 0,
        }
    }

    /// Build from a raw mantissa and scale, normalizing trailing zeros.
    pub fn new(mantissa: u128, scale: u8) -> Result<Self, TypesError> {
        let mut d = Self { mantissa, scale };
        d.normalize();
        if d.scale > Self::MAX_SCALE {
            return Err(TypesError::InvalidDecimal(format!(
                "more than {} fractional digits",
                Self::MAX_SCALE
            )));
        }
        Ok(d)
    }

    pub fn mantissa(&self) -> u128 {
        self.mantissa
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    pub fn is_integer(&self) -> bool {
        self.scale == 0
    }

    fn normalize(&mut self) {
        if self.mantissa == 0 {
            self.scale = 0;
            return;
        }
        while self.scale > 0 && self.mantissa % 10 == 0 {
            self.mantissa /= 10;
            self.scale -= 1;
        }
    }
}

impl FromStr for Decimal {
    type Err = TypesError;

    /// Parse plain (`100.3`) or exponent (`1.5e-7`) notation.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || TypesError::InvalidDecimal(raw.to_string());
        let s = raw.trim();
        let (body, exp) = match s.find(['e', 'E']) {
            Some(pos) => {
                let exp: i64 = s[pos + 1..].parse().map_err(|_| invalid())?;
                (&s[..pos], exp)
            }
            None => (s, 0),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let mut digits = format!("{int_part}{frac_part}");
        let mut scale = (frac_part.len() as i64)
            .checked_sub(exp)
            .ok_or_else(invalid)?;
        if scale < 0 {
            if scale.unsigned_abs() > Self::MAX_DIGITS as u64 {
                return Err(invalid());
            }
            digits.extend(std::iter::repeat('0').take(scale.unsigned_abs() as usize));
            scale = 0;
        }
        while scale > 0 && digits.ends_with('0') {
            digits.pop();
            scale -= 1;
        }
        let significant = digits.trim_start_matches('0');
        if significant.len() > Self::MAX_DIGITS {
            return Err(invalid());
        }
        let mantissa = if significant.is_empty() {
            0
        } else {
            significant.parse::<u128>().map_err(|_| invalid())?
        };
        let scale = u8::try_from(scale).map_err(|_| invalid())?;
        Self::new(mantissa, scale)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.to_string();
        if self.scale == 0 {
            return write!(f, "{digits}");
        }
        let scale = self.scale as usize;
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{int_part}.{frac_part}")
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
