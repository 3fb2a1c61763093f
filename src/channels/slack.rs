//! Slack Channel Implementation
//!
//! Posts polls to Slack via the Web API as Block Kit messages with a radio
//! button group, so users can vote straight from the channel.

use super::interaction::{encode_choice, SUBMIT_ACTION_ID, VOTE_ACTION_ID};
use crate::polls::Poll;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Slack channel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlackConfig {
    /// Deliver new polls to Slack
    pub enabled: bool,
    /// Bot token from Slack App (xoxb-...)
    pub bot_token: String,
    /// Signing secret for verification
    pub signing_secret: String,
    /// Channel new polls are posted to
    pub default_channel: String,
    /// Web API base URL
    pub api_base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for retryable delivery failures
    pub max_retries: u32,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            signing_secret: String::new(),
            default_channel: String::new(),
            api_base_url: "https://slack.com/api".to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl SlackConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }

        if self.bot_token.is_empty() {
            return Err("Slack bot token is required".to_string());
        }

        if self.default_channel.is_empty() {
            return Err("Slack default channel is required".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("Slack timeout must be greater than zero".to_string());
        }

        Ok(())
    }
}

/// Slack channel error
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {0}")]
    Http(u16),
    #[error("API error: {0}")]
    Api(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Poll cannot be rendered as Block Kit: {0}")]
    Unrenderable(String),
}

impl SlackError {
    /// Whether delivery may succeed if tried again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http(status) => *status == 429 || *status >= 500,
            Self::Api(code) => code == "ratelimited" || code == "internal_error",
            Self::Parse(_) | Self::Unrenderable(_) => false,
        }
    }
}

/// Slack channel struct
#[derive(Debug, Clone)]
pub struct SlackChannel {
    config: SlackConfig,
    client: reqwest::Client,
}

impl SlackChannel {
    /// Create a new Slack channel
    pub fn new(config: SlackConfig) -> Result<Self, SlackError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SlackError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Get the API method URL
    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), method)
    }

    /// Send a request to the Slack API
    async fn api_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, SlackError> {
        let response = self
            .client
            .post(self.api_url(method))
            .bearer_auth(&self.config.bot_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SlackError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SlackError::Http(status.as_u16()));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SlackError::Parse(e.to_string()))?;

        if json.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let error_msg = json
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");
            return Err(SlackError::Api(error_msg.to_string()));
        }

        serde_json::from_value(json).map_err(|e| SlackError::Parse(e.to_string()))
    }

    /// Send a message, returning its timestamp ID
    pub async fn send_message(
        &self,
        channel: &str,
        text: &str,
        blocks: &[SlackBlock],
    ) -> Result<String, SlackError> {
        let mut body = serde_json::json!({
            "channel": channel,
            "text": text,
        });

        if !blocks.is_empty() {
            body["blocks"] = serde_json::json!(blocks.iter().map(|b| b.to_json()).collect::<Vec<_>>());
        }

        self.api_request::<SlackMessageResponse>("chat.postMessage", body)
            .await
            .map(|r| r.ts)
    }

    /// Post a poll to the default channel
    pub async fn publish_poll(&self, poll: &Poll) -> Result<String, SlackError> {
        let blocks = render_poll(poll)?;
        debug!(poll_id = %poll.id, channel = %self.config.default_channel, "Posting poll to Slack");
        self.send_message(&self.config.default_channel, &poll.question, &blocks)
            .await
    }

    /// Check the bot token
    pub async fn connect(&self) -> Result<(), SlackError> {
        info!("Connecting to Slack...");

        let auth: SlackAuthResponse = self.api_request("auth.test", serde_json::json!({})).await?;

        info!(team = %auth.team, user_id = %auth.user_id, "Slack connected successfully");
        Ok(())
    }
}

// Slack API response types

#[derive(Debug, Deserialize)]
struct SlackAuthResponse {
    user_id: String,
    team: String,
}

#[derive(Debug, Deserialize)]
struct SlackMessageResponse {
    ts: String,
}

// Block Kit limits
const MAX_HEADER_CHARS: usize = 150;
const MAX_OPTION_CHARS: usize = 75;
const MAX_RADIO_OPTIONS: usize = 10;
const MAX_SELECT_OPTIONS: usize = 100;

const EMPTY_OPTION_TEXT: &str = "(blank)";

/// Render a poll as Block Kit blocks: question header, choice element, submit button.
///
/// Up to 10 options render as radio buttons, up to 100 as a static select.
/// Texts are clipped to Slack's length limits; larger polls are rejected.
pub fn render_poll(poll: &Poll) -> Result<Vec<SlackBlock>, SlackError> {
    if poll.options.len() > MAX_SELECT_OPTIONS {
        return Err(SlackError::Unrenderable(format!(
            "poll {} has {} options, Slack allows at most {}",
            poll.id,
            poll.options.len(),
            MAX_SELECT_OPTIONS
        )));
    }

    let choices: Vec<SlackChoice> = poll
        .options
        .iter()
        .map(|o| SlackChoice {
            text: if o.text.trim().is_empty() {
                EMPTY_OPTION_TEXT.to_string()
            } else {
                clip(&o.text, MAX_OPTION_CHARS)
            },
            value: encode_choice(&poll.id, &o.id),
        })
        .collect();

    let element = if choices.len() <= MAX_RADIO_OPTIONS {
        SlackBlockElement::radio_buttons(VOTE_ACTION_ID, choices)
    } else {
        SlackBlockElement::static_select(VOTE_ACTION_ID, "Pick an option", choices)
    };

    Ok(vec![
        SlackBlock::header(&clip(&poll.question, MAX_HEADER_CHARS)),
        SlackBlock::section("Choose an option:").with_accessory(element),
        SlackBlock::button("Submit Vote", SUBMIT_ACTION_ID, SUBMIT_ACTION_ID).primary(),
    ])
}

/// Clip `text` to at most `max` characters, marking the cut with an ellipsis
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max - 1).collect();
    clipped.push('…');
    clipped
}

/// Slack Block Kit block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackBlock {
    block_type: String,
    text: Option<SlackText>,
    elements: Vec<SlackBlockElement>,
    accessory: Option<SlackBlockElement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SlackText {
    type_: String,
    text: String,
    emoji: Option<bool>,
}

impl SlackText {
    fn plain(text: &str) -> Self {
        Self {
            type_: "plain_text".to_string(),
            text: text.to_string(),
            emoji: Some(true),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        let mut json = serde_json::json!({
            "type": self.type_,
            "text": self.text,
        });
        if let Some(emoji) = self.emoji {
            json["emoji"] = serde_json::json!(emoji);
        }
        json
    }
}

/// One choice in a radio button group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackChoice {
    pub text: String,
    pub value: String,
}

/// Interactive element inside a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackBlockElement {
    type_: String,
    text: Option<SlackText>,
    action_id: Option<String>,
    value: Option<String>,
    style: Option<String>,
    placeholder: Option<SlackText>,
    options: Vec<SlackChoice>,
}

impl SlackBlockElement {
    /// Radio button group
    pub fn radio_buttons(action_id: &str, options: Vec<SlackChoice>) -> Self {
        Self {
            type_: "radio_buttons".to_string(),
            text: None,
            action_id: Some(action_id.to_string()),
            value: None,
            style: None,
            placeholder: None,
            options,
        }
    }

    /// Single-choice dropdown
    pub fn static_select(action_id: &str, placeholder: &str, options: Vec<SlackChoice>) -> Self {
        Self {
            type_: "static_select".to_string(),
            text: None,
            action_id: Some(action_id.to_string()),
            value: None,
            style: None,
            placeholder: Some(SlackText::plain(placeholder)),
            options,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        let mut json = serde_json::json!({
            "type": self.type_,
        });
        if let Some(text) = &self.text {
            json["text"] = text.to_json();
        }
        if let Some(action_id) = &self.action_id {
            json["action_id"] = serde_json::json!(action_id.as_str());
        }
        if let Some(value) = &self.value {
            json["value"] = serde_json::json!(value.as_str());
        }
        if let Some(style) = &self.style {
            json["style"] = serde_json::json!(style.as_str());
        }
        if let Some(placeholder) = &self.placeholder {
            json["placeholder"] = placeholder.to_json();
        }
        if !self.options.is_empty() {
            json["options"] = serde_json::json!(self
                .options
                .iter()
                .map(|o| serde_json::json!({
                    "text": {"type": "plain_text", "text": o.text},
                    "value": o.value,
                }))
                .collect::<Vec<_>>());
        }
        json
    }
}

impl SlackBlock {
    /// Create a header block
    pub fn header(text: &str) -> Self {
        Self {
            block_type: "header".to_string(),
            text: Some(SlackText::plain(text)),
            elements: vec![],
            accessory: None,
        }
    }

    /// Create a section block
    pub fn section(text: &str) -> Self {
        Self {
            block_type: "section".to_string(),
            text: Some(SlackText {
                type_: "mrkdwn".to_string(),
                text: text.to_string(),
                emoji: None,
            }),
            elements: vec![],
            accessory: None,
        }
    }

    /// Create an actions block holding one button
    pub fn button(text: &str, action_id: &str, value: &str) -> Self {
        Self {
            block_type: "actions".to_string(),
            text: None,
            elements: vec![SlackBlockElement {
                type_: "button".to_string(),
                text: Some(SlackText::plain(text)),
                action_id: Some(action_id.to_string()),
                value: Some(value.to_string()),
                style: None,
                placeholder: None,
                options: vec![],
            }],
            accessory: None,
        }
    }

    /// Attach an accessory element
    pub fn with_accessory(mut self, element: SlackBlockElement) -> Self {
        self.accessory = Some(element);
        self
    }

    /// Style all buttons in the block as primary
    pub fn primary(mut self) -> Self {
        for element in &mut self.elements {
            element.style = Some("primary".to_string());
        }
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut json = serde_json::json!({
            "type": self.block_type,
        });

        if let Some(text) = &self.text {
            json["text"] = text.to_json();
        }

        if let Some(accessory) = &self.accessory {
            json["accessory"] = accessory.to_json();
        }

        if !self.elements.is_empty() {
            json["elements"] =
                serde_json::json!(self.elements.iter().map(|e| e.to_json()).collect::<Vec<_>>());
        }

        json
    }
}
