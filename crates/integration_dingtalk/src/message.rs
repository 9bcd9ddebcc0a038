//! Robot message payloads
//!
//! Every message serializes to the shape the webhook expects: a `msgtype`
//! discriminator, a nested object named after the type, and an `at` block.
//!
//! ```text
//! {
//!   "msgtype": "text",
//!   "text": { "content": "hello" },
//!   "at": { "atMobiles": [], "isAtAll": false }
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DingTalkError;

/// Message type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Plain text
    Text,
    /// Link card with title, summary and target URL
    Link,
    /// Markdown document
    Markdown,
}

impl MessageType {
    /// Wire name of the message type
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Link => "link",
            Self::Markdown => "markdown",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    /// Message content, forwarded verbatim
    pub content: String,
}

/// Link message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Card title
    pub title: String,
    /// Card summary
    pub text: String,
    /// URL opened when the card is clicked
    pub message_url: String,
    /// Thumbnail URL, empty when the card has no picture
    #[serde(default)]
    pub pic_url: String,
}

impl Link {
    /// Create a link card without a picture
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        message_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            message_url: message_url.into(),
            pic_url: String::new(),
        }
    }

    /// Set the thumbnail URL
    #[must_use]
    pub fn with_pic_url(mut self, pic_url: impl Into<String>) -> Self {
        self.pic_url = pic_url.into();
        self
    }
}

/// Markdown message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markdown {
    /// Title shown in the conversation list
    pub title: String,
    /// Markdown source
    pub text: String,
}

/// A robot message
///
/// Serializes as an externally tagged object (`{"text": {...}}`), which
/// [`OutboundPayload`] flattens next to `msgtype` and `at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Message {
    /// Plain text
    Text(Text),
    /// Link card
    Link(Link),
    /// Markdown document
    Markdown(Markdown),
}

impl Message {
    /// Create a text message
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(Text {
            content: content.into(),
        })
    }

    /// Create a link message without a picture
    #[must_use]
    pub fn link(
        title: impl Into<String>,
        text: impl Into<String>,
        message_url: impl Into<String>,
    ) -> Self {
        Self::Link(Link::new(title, text, message_url))
    }

    /// Create a markdown message
    #[must_use]
    pub fn markdown(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Markdown(Markdown {
            title: title.into(),
            text: text.into(),
        })
    }

    /// Discriminator of this message
    #[must_use]
    pub const fn msg_type(&self) -> MessageType {
        match self {
            Self::Text(_) => MessageType::Text,
            Self::Link(_) => MessageType::Link,
            Self::Markdown(_) => MessageType::Markdown,
        }
    }

    /// Final body with the given mentions
    #[must_use]
    pub fn attach_at<I, S>(self, mobiles: I, at_all: bool) -> OutboundPayload
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OutboundPayload::new(self).attach_at(mobiles, at_all)
    }

    /// Final body with the default (empty) mentions
    #[must_use]
    pub fn into_body(self) -> OutboundPayload {
        OutboundPayload::new(self)
    }
}

impl From<Text> for Message {
    fn from(text: Text) -> Self {
        Self::Text(text)
    }
}

impl From<Link> for Message {
    fn from(link: Link) -> Self {
        Self::Link(link)
    }
}

impl From<Markdown> for Message {
    fn from(markdown: Markdown) -> Self {
        Self::Markdown(markdown)
    }
}

/// Mention directive attached to every message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtDirective {
    /// Mobile numbers of the members to mention
    #[serde(rename = "atMobiles")]
    pub mobiles: Vec<String>,
    /// Mention everyone in the group
    #[serde(rename = "isAtAll")]
    pub at_all: bool,
}

impl AtDirective {
    /// Create a directive mentioning the given mobiles
    #[must_use]
    pub fn new<I, S>(mobiles: I, at_all: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mobiles: mobiles.into_iter().map(Into::into).collect(),
            at_all,
        }
    }

    /// Directive mentioning everyone
    #[must_use]
    pub fn everyone() -> Self {
        Self {
            mobiles: Vec::new(),
            at_all: true,
        }
    }

    /// True if nobody is mentioned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mobiles.is_empty() && !self.at_all
    }
}

/// Final JSON body posted to the webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundPayload {
    msgtype: MessageType,
    #[serde(flatten)]
    message: Message,
    at: AtDirective,
}

impl OutboundPayload {
    /// Wrap a message with the default mention directive
    #[must_use]
    pub fn new(message: Message) -> Self {
        Self {
            msgtype: message.msg_type(),
            message,
            at: AtDirective::default(),
        }
    }

    /// Replace the mention directive
    #[must_use]
    pub fn attach_at<I, S>(self, mobiles: I, at_all: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_at(AtDirective::new(mobiles, at_all))
    }

    /// Replace the mention directive with a prepared one
    #[must_use]
    pub fn with_at(mut self, at: AtDirective) -> Self {
        self.at = at;
        self
    }

    /// Message type of this payload
    #[must_use]
    pub const fn msg_type(&self) -> MessageType {
        self.msgtype
    }

    /// Wrapped message
    #[must_use]
    pub const fn message(&self) -> &Message {
        &self.message
    }

    /// Mention directive
    #[must_use]
    pub const fn at(&self) -> &AtDirective {
        &self.at
    }

    /// Serialize into a JSON value
    pub fn to_value(&self) -> Result<serde_json::Value, DingTalkError> {
        serde_json::to_value(self).map_err(DingTalkError::Encode)
    }
}

impl From<Message> for OutboundPayload {
    fn from(message: Message) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn text_body_has_default_at_block() {
        let body = Message::text("hello").into_body().to_value().unwrap();
        assert_eq!(
            body,
            json!({
                "msgtype": "text",
                "text": { "content": "hello" },
                "at": { "atMobiles": [], "isAtAll": false }
            })
        );
    }

    #[test]
    fn empty_text_is_allowed() {
        let body = Message::text("").into_body().to_value().unwrap();
        assert_eq!(body["text"]["content"], "");
    }

    #[test]
    fn link_body_defaults_pic_url_to_empty() {
        let body = Message::link("T", "body", "https://x")
            .into_body()
            .to_value()
            .unwrap();
        assert_eq!(
            body,
            json!({
                "msgtype": "link",
                "link": {
                    "text": "body",
                    "title": "T",
                    "picUrl": "",
                    "messageUrl": "https://x"
                },
                "at": { "atMobiles": [], "isAtAll": false }
            })
        );
    }

    #[test]
    fn link_with_picture() {
        let message: Message = Link::new("Release", "v1.2 is out", "https://example.com/r")
            .with_pic_url("https://example.com/logo.png")
            .into();
        let body = message.into_body().to_value().unwrap();
        assert_eq!(body["link"]["picUrl"], "https://example.com/logo.png");
        assert_eq!(body["link"]["messageUrl"], "https://example.com/r");
    }

    #[test]
    fn markdown_body() {
        let body = Message::markdown("Deploy", "## done\n- api\n- web")
            .into_body()
            .to_value()
            .unwrap();
        assert_eq!(
            body,
            json!({
                "msgtype": "markdown",
                "markdown": { "title": "Deploy", "text": "## done\n- api\n- web" },
                "at": { "atMobiles": [], "isAtAll": false }
            })
        );
    }

    #[test]
    fn attach_at_sets_mentions_in_order() {
        let body = Message::text("ping")
            .attach_at(["13800000002", "13800000001"], false)
            .to_value()
            .unwrap();
        assert_eq!(
            body["at"],
            json!({ "atMobiles": ["13800000002", "13800000001"], "isAtAll": false })
        );
    }

    #[test]
    fn attach_at_with_no_mobiles_matches_default() {
        let explicit = Message::text("x").attach_at(Vec::<String>::new(), false);
        let implicit = Message::text("x").into_body();
        assert_eq!(explicit, implicit);
    }

    #[test]
    fn attach_at_replaces_previous_directive() {
        let payload = Message::text("x")
            .attach_at(["1"], false)
            .with_at(AtDirective::everyone());
        assert!(payload.at().mobiles.is_empty());
        assert!(payload.at().at_all);
    }

    #[test]
    fn content_is_forwarded_verbatim() {
        let raw = "<b>\"quoted\"</b> & 中文 \n tab\t";
        let body = Message::text(raw).into_body().to_value().unwrap();
        assert_eq!(body["text"]["content"], raw);
    }

    #[test]
    fn payload_exposes_message_and_type() {
        let payload = OutboundPayload::from(Message::markdown("t", "x"));
        assert_eq!(payload.msg_type(), MessageType::Markdown);
        assert_eq!(payload.message(), &Message::markdown("t", "x"));
    }

    #[test]
    fn message_type_display() {
        assert_eq!(MessageType::Text.to_string(), "text");
        assert_eq!(MessageType::Link.to_string(), "link");
        assert_eq!(MessageType::Markdown.to_string(), "markdown");
    }

    #[test]
    fn at_directive_is_empty() {
        assert!(AtDirective::default().is_empty());
        assert!(!AtDirective::everyone().is_empty());
        assert!(!AtDirective::new(["1"], false).is_empty());
    }

    #[test]
    fn at_directive_deserializes_wire_names() {
        let at: AtDirective =
            serde_json::from_value(json!({ "atMobiles": ["1"], "isAtAll": true })).unwrap();
        assert_eq!(at, AtDirective::new(["1"], true));
    }
}
