//! Subject-typed vote payloads and their structural validation.

use opgov_types::{Address, Decimal};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::fmt;

use crate::subject::{Subject, ValueKind};
use crate::GovernanceError;

/// A canonically sorted, duplicate-free, fixed-cardinality set of order
/// providers.
///
/// Sorting happens on construction, so two lists naming the same addresses
/// compare, serialize and hash identically.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitteeList(Vec<Address>);

impl CommitteeList {
    pub fn new(addresses: Vec<Address>, size: usize) -> Result<Self, GovernanceError> {
        if addresses.len() != size {
            return Err(GovernanceError::malformed(
                Subject::OpList,
                format!("expected {size} order providers, got {}", addresses.len()),
            ));
        }
        let unique: BTreeSet<Address> = addresses.into_iter().collect();
        if unique.len() != size {
            return Err(GovernanceError::malformed(
                Subject::OpList,
                "duplicate order provider",
            ));
        }
        Ok(Self(unique.into_iter().collect()))
    }

    pub fn addresses(&self) -> &[Address] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.0.binary_search(address).is_ok()
    }
}

impl fmt::Display for CommitteeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Address::as_str).collect();
        write!(f, "[{}]", names.join(","))
    }
}

/// Decimal digits an f64 always carries through a parse and print cycle.
/// Floats printed with more digits may have been rounded on the way in.
const F64_EXACT_DIGITS: usize = 15;

fn significant_digits(text: &str) -> usize {
    let mantissa = text.split(['e', 'E']).next().unwrap_or_default();
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    digits.trim_start_matches('0').trim_end_matches('0').len()
}

/// Tagged union of vote payloads; the variant is dictated by the subject.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectValue {
    OpList(CommitteeList),
    Numeric(Decimal),
}

impl SubjectValue {
    /// Parse and validate the `value` field of a vote message.
    pub fn from_json(
        subject: Subject,
        raw: &JsonValue,
        committee_size: usize,
    ) -> Result<Self, GovernanceError> {
        let value = match subject.kind() {
            ValueKind::Committee => {
                let items = raw.as_array().ok_or_else(|| {
                    GovernanceError::malformed(subject, "expected an array of addresses")
                })?;
                let addresses = items
                    .iter()
                    .map(|item| {
                        let s = item.as_str().ok_or_else(|| {
                            GovernanceError::malformed(subject, "address must be a string")
                        })?;
                        Address::parse(s)
                            .map_err(|e| GovernanceError::malformed(subject, e.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Self::OpList(CommitteeList::new(addresses, committee_size)?)
            }
            ValueKind::Numeric => {
                // Parse the number's textual form; going through f64 arithmetic
                // would let `100.3` drift.
                let text = match raw {
                    JsonValue::Number(n) if n.is_f64() => {
                        let text = n.to_string();
                        if significant_digits(&text) > F64_EXACT_DIGITS {
                            return Err(GovernanceError::malformed(
                                subject,
                                format!(
                                    "{text} is not exact as a JSON number, send it as a string"
                                ),
                            ));
                        }
                        text
                    }
                    JsonValue::Number(n) => n.to_string(),
                    JsonValue::String(s) => s.clone(),
                    _ => return Err(GovernanceError::malformed(subject, "expected a number")),
                };
                let number: Decimal = text
                    .parse()
                    .map_err(|e: opgov_types::TypesError| {
                        GovernanceError::malformed(subject, e.to_string())
                    })?;
                Self::Numeric(number)
            }
        };
        value.validate(subject, committee_size)?;
        Ok(value)
    }

    /// Subject-specific structural validation.
    pub fn validate(&self, subject: Subject, committee_size: usize) -> Result<(), GovernanceError> {
        match (subject, self) {
            (Subject::OpList, Self::OpList(list)) => {
                if list.len() != committee_size {
                    return Err(GovernanceError::malformed(
                        subject,
                        format!("expected {committee_size} order providers, got {}", list.len()),
                    ));
                }
                Ok(())
            }
            (Subject::OpList, Self::Numeric(_)) => Err(GovernanceError::malformed(
                subject,
                "expected a committee list",
            )),
            (_, Self::OpList(_)) => Err(GovernanceError::malformed(subject, "expected a number")),
            (Subject::BaseTpsFee, Self::Numeric(_)) => Ok(()),
            (Subject::ThresholdSize, Self::Numeric(n)) => {
                if n.is_zero() || !n.is_integer() {
                    return Err(GovernanceError::malformed(subject, "must be a positive integer"));
                }
                Ok(())
            }
            (Subject::TpsInterval | Subject::TpsFeeMultiplier, Self::Numeric(n)) => {
                if n.is_zero() {
                    return Err(GovernanceError::malformed(subject, "must be positive"));
                }
                Ok(())
            }
        }
    }

    /// Canonical byte form. Two values are the same vote value iff these match.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, GovernanceError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn as_committee(&self) -> Option<&CommitteeList> {
        match self {
            Self::OpList(list) => Some(list),
            Self::Numeric(_) => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::OpList(_) => None,
        }
    }
}

impl fmt::Display for SubjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpList(list) => write!(f, "{list}"),
            Self::Numeric(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn addr(c: char) -> String {
        c.to_string().repeat(32)
    }

    #[test]
    fn committee_is_sorted_on_construction() {
        let value =
            SubjectValue::from_json(Subject::OpList, &json!([addr('C'), addr('A'), addr('B')]), 3)
                .unwrap();
        let sorted =
            SubjectValue::from_json(Subject::OpList, &json!([addr('A'), addr('B'), addr('C')]), 3)
                .unwrap();
        assert_eq!(value, sorted);
        assert_eq!(
            value.canonical_bytes().unwrap(),
            sorted.canonical_bytes().unwrap()
        );
    }

    #[test]
    fn committee_rejects_duplicates_and_wrong_size() {
        let dup = SubjectValue::from_json(Subject::OpList, &json!([addr('A'), addr('A'), addr('B')]), 3);
        assert!(matches!(dup, Err(GovernanceError::MalformedValue { .. })));

        let short = SubjectValue::from_json(Subject::OpList, &json!([addr('A'), addr('B')]), 3);
        assert!(matches!(short, Err(GovernanceError::MalformedValue { .. })));

        let long = SubjectValue::from_json(
            Subject::OpList,
            &json!([addr('A'), addr('B'), addr('C'), addr('D')]),
            3,
        );
        assert!(matches!(long, Err(GovernanceError::MalformedValue { .. })));
    }

    #[test]
    fn committee_rejects_bad_addresses() {
        let bad = SubjectValue::from_json(Subject::OpList, &json!(["short", addr('A'), addr('B')]), 3);
        assert!(matches!(bad, Err(GovernanceError::MalformedValue { .. })));
        let not_array = SubjectValue::from_json(Subject::OpList, &json!(addr('A')), 3);
        assert!(not_array.is_err());
    }

    #[test]
    fn json_number_keeps_decimal_fidelity() {
        let value = SubjectValue::from_json(Subject::BaseTpsFee, &json!(100.3), 3).unwrap();
        assert_eq!(value.as_decimal().unwrap().to_string(), "100.3");
        let from_str = SubjectValue::from_json(Subject::BaseTpsFee, &json!("100.30"), 3).unwrap();
        assert_eq!(value, from_str);
    }

    #[test]
    fn long_json_float_is_refused_but_string_is_exact() {
        let raw: JsonValue = serde_json::from_str("1234.12345678901234567").unwrap();
        let float = SubjectValue::from_json(Subject::BaseTpsFee, &raw, 3);
        assert!(matches!(float, Err(GovernanceError::MalformedValue { .. })));

        let text = SubjectValue::from_json(Subject::BaseTpsFee, &json!("1234.12345678901234567"), 3)
            .unwrap();
        assert_eq!(text.to_string(), "1234.12345678901234567");

        let short: JsonValue = serde_json::from_str("0.123456789012345").unwrap();
        assert!(SubjectValue::from_json(Subject::BaseTpsFee, &short, 3).is_ok());
    }

    #[test]
    fn significant_digits_ignore_padding_and_exponent() {
        assert_eq!(significant_digits("100.3"), 4);
        assert_eq!(significant_digits("0.00015"), 2);
        assert_eq!(significant_digits("1.2345678901234568e20"), 17);
        assert_eq!(significant_digits("1e-7"), 1);
    }

    #[test]
    fn numeric_subject_rules() {
        assert!(SubjectValue::from_json(Subject::BaseTpsFee, &json!(0), 3).is_ok());
        assert!(SubjectValue::from_json(Subject::BaseTpsFee, &json!(-1), 3).is_err());
        assert!(SubjectValue::from_json(Subject::ThresholdSize, &json!(10.5), 3).is_err());
        assert!(SubjectValue::from_json(Subject::ThresholdSize, &json!(10000), 3).is_ok());
        assert!(SubjectValue::from_json(Subject::TpsInterval, &json!(0), 3).is_err());
        assert!(SubjectValue::from_json(Subject::TpsFeeMultiplier, &json!([1]), 3).is_err());
    }

    #[test]
    fn variant_must_match_subject() {
        let number = SubjectValue::Numeric(Decimal::from_integer(1));
        assert!(number.validate(Subject::OpList, 3).is_err());
    }
}
