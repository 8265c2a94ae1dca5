//! Governance messages carried by ledger units.
//!
//! Vote: `{"app":"system_vote","payload":{"subject":"op_list","value":[...]}}`.
//! Count: `{"app":"system_vote_count","payload":"op_list"}`, or with an object
//! payload `{"subject":"op_list","emergency":true}` for the emergency path.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::emergency::ActivationPath;
use crate::subject::Subject;
use crate::value::SubjectValue;
use crate::GovernanceError;

/// Raw message as it appears in a unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "app", content = "payload", rename_all = "snake_case")]
pub enum GovernanceMessage {
    SystemVote(VotePayload),
    SystemVoteCount(CountPayload),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VotePayload {
    pub subject: String,
    pub value: JsonValue,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountPayload {
    Subject(String),
    Flagged {
        subject: String,
        #[serde(default)]
        emergency: bool,
    },
}

/// A message after subject lookup and value validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedMessage {
    Vote { subject: Subject, value: SubjectValue },
    Count { subject: Subject, path: ActivationPath },
}

impl GovernanceMessage {
    pub fn from_json(raw: &str) -> Result<Self, GovernanceError> {
        serde_json::from_str(raw).map_err(|e| GovernanceError::Serialization(e.to_string()))
    }

    pub fn vote(subject: Subject, value: JsonValue) -> Self {
        Self::SystemVote(VotePayload {
            subject: subject.name().to_string(),
            value,
        })
    }

    pub fn count(subject: Subject, path: ActivationPath) -> Self {
        let payload = match path {
            ActivationPath::Ordinary => CountPayload::Subject(subject.name().to_string()),
            ActivationPath::Emergency => CountPayload::Flagged {
                subject: subject.name().to_string(),
                emergency: true,
            },
        };
        Self::SystemVoteCount(payload)
    }

    /// Resolve the subject and validate the payload.
    pub fn parse(&self, committee_size: usize) -> Result<ParsedMessage, GovernanceError> {
        match self {
            Self::SystemVote(payload) => {
                let subject: Subject = payload.subject.parse()?;
                let value = SubjectValue::from_json(subject, &payload.value, committee_size)?;
                Ok(ParsedMessage::Vote { subject, value })
            }
            Self::SystemVoteCount(CountPayload::Subject(name)) => Ok(ParsedMessage::Count {
                subject: name.parse()?,
                path: ActivationPath::Ordinary,
            }),
            Self::SystemVoteCount(CountPayload::Flagged { subject, emergency }) => {
                Ok(ParsedMessage::Count {
                    subject: subject.parse()?,
                    path: ActivationPath::from_flag(*emergency),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opgov_types::Decimal;
    use serde_json::json;

    #[test]
    fn parses_vote_message() {
        let msg = GovernanceMessage::from_json(
            r#"{"app":"system_vote","payload":{"subject":"base_tps_fee","value":100.3}}"#,
        )
        .unwrap();
        let parsed = msg.parse(3).unwrap();
        assert_eq!(
            parsed,
            ParsedMessage::Vote {
                subject: Subject::BaseTpsFee,
                value: SubjectValue::Numeric("100.3".parse::<Decimal>().unwrap()),
            }
        );
    }

    #[test]
    fn parses_count_messages() {
        let ordinary =
            GovernanceMessage::from_json(r#"{"app":"system_vote_count","payload":"op_list"}"#)
                .unwrap();
        assert_eq!(
            ordinary.parse(3).unwrap(),
            ParsedMessage::Count {
                subject: Subject::OpList,
                path: ActivationPath::Ordinary
            }
        );

        let emergency = GovernanceMessage::from_json(
            r#"{"app":"system_vote_count","payload":{"subject":"op_list","emergency":true}}"#,
        )
        .unwrap();
        assert_eq!(
            emergency.parse(3).unwrap(),
            ParsedMessage::Count {
                subject: Subject::OpList,
                path: ActivationPath::Emergency
            }
        );
    }

    #[test]
    fn unknown_subject_is_invalid() {
        let msg = GovernanceMessage::vote(Subject::OpList, json!([]));
        let GovernanceMessage::SystemVote(mut payload) = msg else {
            unreachable!()
        };
        payload.subject = "block_size".into();
        assert!(matches!(
            GovernanceMessage::SystemVote(payload).parse(3),
            Err(GovernanceError::InvalidSubject(_))
        ));
    }

    #[test]
    fn constructors_round_trip_through_json() {
        let msg = GovernanceMessage::count(Subject::TpsInterval, ActivationPath::Emergency);
        let text = serde_json::to_string(&msg).unwrap();
        assert_eq!(GovernanceMessage::from_json(&text).unwrap(), msg);
    }
}
