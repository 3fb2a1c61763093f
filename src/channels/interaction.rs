//! Slack interaction decoding
//!
//! A rendered poll carries `pollId:optionId` as the value of each radio
//! option. When a user picks one, Slack posts a `block_actions` payload back
//! to us; this module turns that payload into the `(poll, option, voter)`
//! triple the store votes with.

use serde::Deserialize;
use std::collections::HashMap;

/// Action ID of the radio button group
pub const VOTE_ACTION_ID: &str = "poll_vote";
/// Action ID of the submit button
pub const SUBMIT_ACTION_ID: &str = "submit_vote";

const SEPARATOR: char = ':';

/// Interaction decoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InteractionError {
    #[error("Missing payload field")]
    MissingPayload,
    #[error("Malformed payload: {0}")]
    Malformed(String),
    #[error("Unsupported interaction type: {0}")]
    UnsupportedType(String),
    #[error("No poll selection in interaction")]
    NoSelection,
    #[error("Invalid choice value: {0}")]
    InvalidChoice(String),
}

/// A decoded vote request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteChoice {
    pub poll_id: String,
    pub option_id: String,
    pub voter_id: String,
}

/// Encode a poll option as a single Slack option value
pub fn encode_choice(poll_id: &str, option_id: &str) -> String {
    format!("{}{}{}", poll_id, SEPARATOR, option_id)
}

/// Split a Slack option value back into `(poll_id, option_id)`
pub fn decode_choice(value: &str) -> Result<(String, String), InteractionError> {
    match value.split_once(SEPARATOR) {
        Some((poll_id, option_id)) if !poll_id.is_empty() && !option_id.is_empty() => {
            Ok((poll_id.to_string(), option_id.to_string()))
        }
        _ => Err(InteractionError::InvalidChoice(value.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct InteractionPayload {
    #[serde(rename = "type")]
    kind: String,
    user: SlackUser,
    #[serde(default)]
    actions: Vec<BlockAction>,
    #[serde(default)]
    state: Option<BlockState>,
}

#[derive(Debug, Deserialize)]
struct SlackUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct BlockAction {
    action_id: String,
    #[serde(default)]
    selected_option: Option<SelectedOption>,
}

#[derive(Debug, Deserialize)]
struct SelectedOption {
    value: String,
}

#[derive(Debug, Deserialize)]
struct BlockState {
    #[serde(default)]
    values: HashMap<String, HashMap<String, StateValue>>,
}

#[derive(Debug, Deserialize)]
struct StateValue {
    #[serde(default)]
    selected_option: Option<SelectedOption>,
}

/// Pull the `payload` field out of a form-encoded interaction body
pub fn payload_from_form(body: &[u8]) -> Result<String, InteractionError> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value.into_owned())
        .ok_or(InteractionError::MissingPayload)
}

/// Decode a `block_actions` JSON payload into a vote
pub fn parse_vote(payload: &str) -> Result<VoteChoice, InteractionError> {
    let payload: InteractionPayload =
        serde_json::from_str(payload).map_err(|e| InteractionError::Malformed(e.to_string()))?;

    if payload.kind != "block_actions" {
        return Err(InteractionError::UnsupportedType(payload.kind));
    }

    let value = selected_value(&payload).ok_or(InteractionError::NoSelection)?;
    let (poll_id, option_id) = decode_choice(value)?;

    Ok(VoteChoice {
        poll_id,
        option_id,
        voter_id: payload.user.id,
    })
}

fn selected_value(payload: &InteractionPayload) -> Option<&str> {
    for action in &payload.actions {
        match action.action_id.as_str() {
            VOTE_ACTION_ID => {
                if let Some(selected) = &action.selected_option {
                    return Some(&selected.value);
                }
            }
            SUBMIT_ACTION_ID => {
                let state = payload.state.as_ref()?;
                return state
                    .values
                    .values()
                    .flat_map(|block| block.iter())
                    .filter(|(action_id, _)| action_id.as_str() == VOTE_ACTION_ID)
                    .find_map(|(_, v)| v.selected_option.as_ref())
                    .map(|s| s.value.as_str());
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_choice_codec() {
        let value = encode_choice("p1", "o2");
        assert_eq!(value, "p1:o2");
        assert_eq!(
            decode_choice(&value),
            Ok(("p1".to_string(), "o2".to_string()))
        );
    }

    #[test]
    fn test_decode_choice_rejects_malformed() {
        for bad in ["", "p1", ":o2", "p1:", ":"] {
            assert!(
                matches!(decode_choice(bad), Err(InteractionError::InvalidChoice(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_parse_radio_selection() {
        let payload = json!({
            "type": "block_actions",
            "user": {"id": "U123", "name": "alice"},
            "actions": [{
                "action_id": "poll_vote",
                "type": "radio_buttons",
                "selected_option": {"value": "p1:o2", "text": {"type": "plain_text", "text": "Salad"}}
            }]
        });

        let vote = parse_vote(&payload.to_string()).unwrap();
        assert_eq!(
            vote,
            VoteChoice {
                poll_id: "p1".to_string(),
                option_id: "o2".to_string(),
                voter_id: "U123".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_submit_uses_state() {
        let payload = json!({
            "type": "block_actions",
            "user": {"id": "U9"},
            "actions": [{"action_id": "submit_vote", "type": "button", "value": "submit_vote"}],
            "state": {"values": {"blk": {"poll_vote": {
                "type": "radio_buttons",
                "selected_option": {"value": "p1:o1"}
            }}}}
        });

        let vote = parse_vote(&payload.to_string()).unwrap();
        assert_eq!(vote.option_id, "o1");
        assert_eq!(vote.voter_id, "U9");
    }

    #[test]
    fn test_parse_submit_without_selection() {
        let payload = json!({
            "type": "block_actions",
            "user": {"id": "U9"},
            "actions": [{"action_id": "submit_vote"}],
            "state": {"values": {"blk": {"poll_vote": {"type": "radio_buttons", "selected_option": null}}}}
        });

        assert_eq!(
            parse_vote(&payload.to_string()),
            Err(InteractionError::NoSelection)
        );
    }

    #[test]
    fn test_parse_rejects_other_types() {
        let payload = json!({"type": "view_submission", "user": {"id": "U1"}});
        assert_eq!(
            parse_vote(&payload.to_string()),
            Err(InteractionError::UnsupportedType("view_submission".to_string()))
        );
        assert!(matches!(
            parse_vote("not json"),
            Err(InteractionError::Malformed(_))
        ));
    }

    #[test]
    fn test_payload_from_form() {
        let body = b"payload=%7B%22type%22%3A%22block_actions%22%7D&other=1";
        assert_eq!(
            payload_from_form(body).unwrap(),
            r#"{"type":"block_actions"}"#
        );
        assert_eq!(
            payload_from_form(b"other=1"),
            Err(InteractionError::MissingPayload)
        );
    }
}
