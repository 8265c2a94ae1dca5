//! Ledger address type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A ledger address: 32 characters of the RFC 4648 base32 alphabet.
///
/// Addresses order lexicographically, which is the canonical order used when
/// committee lists are stored, compared and hashed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Length of every well-formed address.
    pub const LEN: usize = 32;

    /// Parse and validate an address.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        if raw.len() != Self::LEN {
            return Err(TypesError::InvalidAddress(format!(
                "{raw}: expected {} characters, got {}",
                Self::LEN,
                raw.len()
            )));
        }
        if !raw.bytes().all(is_base32) {
            return Err(TypesError::InvalidAddress(format!(
                "{raw}: not a base32 string"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

fn is_base32(b: u8) -> bool {
    b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b)
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_base32_address() {
        let a = Address::parse("ABCDEFGHIJKLMNOPQRSTUVWXYZ234567").unwrap();
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Address::parse("ABC").is_err());
        assert!(Address::parse(&"A".repeat(33)).is_err());
    }

    #[test]
    fn rejects_lowercase_and_foreign_digits() {
        assert!(Address::parse(&"a".repeat(32)).is_err());
        assert!(Address::parse(&format!("{}1", "A".repeat(31))).is_err());
        assert!(Address::parse(&format!("{}8", "A".repeat(31))).is_err());
    }

    #[test]
    fn serde_rejects_malformed() {
        let bad: Result<Address, _> = serde_json::from_str("\"not-an-address\"");
        assert!(bad.is_err());
        let good: Address = serde_json::from_str(&format!("\"{}\"", "B".repeat(32))).unwrap();
        assert_eq!(good.as_str(), "B".repeat(32));
    }
}
