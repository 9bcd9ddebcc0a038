//! DingTalk robot client
//!
//! Builds the (optionally signed) webhook URL, posts the payload and hands
//! back the parsed JSON reply.

use std::{fmt, sync::Arc, time::Duration};

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, DingTalkConfig, RobotCredential},
    error::DingTalkError,
    message::{AtDirective, Link, Message, OutboundPayload},
    signing::{Clock, Signature, SystemClock},
    transport::{HttpTransport, ReqwestTransport},
};

/// Status fields the webhook puts in every reply
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RobotReply {
    /// `0` on success
    pub errcode: i64,
    /// Human readable status
    #[serde(default)]
    pub errmsg: String,
}

impl RobotReply {
    /// Extract the status fields from a raw reply
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }

    /// Whether the service accepted the message
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.errcode == 0
    }
}

/// Client bound to one robot
#[derive(Clone)]
pub struct RobotClient {
    name: String,
    credential: RobotCredential,
    base_url: String,
    default_at: AtDirective,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for RobotClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotClient")
            .field("name", &self.name)
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("default_at", &self.default_at)
            .finish_non_exhaustive()
    }
}

impl RobotClient {
    /// Create a client for a credential, using the public endpoint and a
    /// reqwest transport with the default timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(credential: RobotCredential) -> Result<Self, DingTalkError> {
        let transport = ReqwestTransport::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?;
        Ok(Self::with_transport(credential, Arc::new(transport)))
    }

    /// Create a client with a custom transport
    #[must_use]
    pub fn with_transport(credential: RobotCredential, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            name: String::new(),
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_at: AtDirective::default(),
            transport,
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a client for a named robot of the configuration
    ///
    /// # Errors
    ///
    /// Returns [`DingTalkError::Configuration`] if the robot is unknown or
    /// the configuration is invalid.
    pub fn from_config(config: &DingTalkConfig, robot_name: &str) -> Result<Self, DingTalkError> {
        config.validate()?;
        let credential = config.credential(robot_name)?;
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;

        Ok(Self::with_transport(credential, Arc::new(transport))
            .with_name(robot_name)
            .with_base_url(&config.base_url))
    }

    /// Name used in logs
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the webhook endpoint
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the clock used for signing
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Mentions applied by [`send_message`](Self::send_message)
    #[must_use]
    pub fn with_default_at(mut self, at: AtDirective) -> Self {
        self.default_at = at;
        self
    }

    /// Robot name (empty if the client was not created from a config)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved credential
    #[must_use]
    pub const fn credential(&self) -> &RobotCredential {
        &self.credential
    }

    /// Webhook URL for a request issued now
    ///
    /// Contains the access token and, for signed robots, a fresh signature.
    /// Do not log it.
    pub fn webhook_url(&self) -> Result<String, DingTalkError> {
        let mut url = format!(
            "{}?access_token={}",
            self.base_url,
            self.credential.access_token()
        );

        if let Some(secret) = self.credential.signing_secret() {
            let signature = Signature::now(self.clock.as_ref(), secret)?;
            url.push_str(&signature.query_suffix());
        }

        Ok(url)
    }

    /// Post a payload and return the parsed reply
    ///
    /// Service-level failures (non-zero `errcode`) are returned as `Ok`;
    /// use [`RobotReply::from_value`] to inspect them.
    #[instrument(skip(self, payload), fields(robot = %self.name, msgtype = %payload.msg_type()))]
    pub async fn send(&self, payload: &OutboundPayload) -> Result<serde_json::Value, DingTalkError> {
        let body = payload.to_value()?;
        let url = self.webhook_url()?;

        debug!(signed = self.credential.is_signed(), "Sending robot message");

        let response = self.transport.post_json(&url, &body).await?;
        if !response.is_success() {
            warn!(status = response.status, "Webhook returned non-success status");
        }

        let reply: serde_json::Value =
            serde_json::from_str(&response.body).map_err(|source| {
                DingTalkError::ResponseFormat {
                    status: response.status,
                    body: response.body.clone(),
                    source,
                }
            })?;

        match RobotReply::from_value(&reply) {
            Some(status) if !status.is_success() => {
                warn!(errcode = status.errcode, errmsg = %status.errmsg, "Robot rejected message");
            },
            _ => debug!("Robot reply parsed"),
        }

        Ok(reply)
    }

    /// Send a message with the client's default mentions
    pub async fn send_message(&self, message: Message) -> Result<serde_json::Value, DingTalkError> {
        let payload = message.into_body().with_at(self.default_at.clone());
        self.send(&payload).await
    }

    /// Send a text message
    pub async fn send_text(
        &self,
        content: &str,
        mobiles: &[&str],
        at_all: bool,
    ) -> Result<serde_json::Value, DingTalkError> {
        let payload = Message::text(content).attach_at(mobiles.iter().copied(), at_all);
        self.send(&payload).await
    }

    /// Send a link card; an empty `pic_url` means no picture
    pub async fn send_link(
        &self,
        title: &str,
        text: &str,
        message_url: &str,
        pic_url: &str,
        mobiles: &[&str],
        at_all: bool,
    ) -> Result<serde_json::Value, DingTalkError> {
        let payload = Message::from(Link::new(title, text, message_url).with_pic_url(pic_url))
            .attach_at(mobiles.iter().copied(), at_all);
        self.send(&payload).await
    }

    /// Send a markdown message
    pub async fn send_markdown(
        &self,
        title: &str,
        text: &str,
        mobiles: &[&str],
        at_all: bool,
    ) -> Result<serde_json::Value, DingTalkError> {
        let payload = Message::markdown(title, text).attach_at(mobiles.iter().copied(), at_all);
        self.send(&payload).await
    }
}
