//! Blocking facade over [`RobotClient`]
//!
//! Drives the async client on a private current-thread runtime. Must not be
//! used or dropped from inside another tokio runtime.

use tokio::runtime::{Builder, Runtime};

use crate::{
    client::RobotClient,
    config::DingTalkConfig,
    error::DingTalkError,
    message::{Message, OutboundPayload},
};

/// Synchronous robot client
///
/// Owns a tokio runtime, so it must be neither used nor dropped inside an
/// async context: dropping it there panics. Create and drop it on a plain
/// thread, or use [`RobotClient`] directly from async code.
#[derive(Debug)]
pub struct BlockingRobotClient {
    inner: RobotClient,
    runtime: Runtime,
}

impl BlockingRobotClient {
    /// Wrap an async client
    ///
    /// # Errors
    ///
    /// Returns [`DingTalkError::Runtime`] if the runtime cannot be started.
    pub fn new(inner: RobotClient) -> Result<Self, DingTalkError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { inner, runtime })
    }

    /// Create a client for a named robot of the configuration
    pub fn from_config(config: &DingTalkConfig, robot_name: &str) -> Result<Self, DingTalkError> {
        Self::new(RobotClient::from_config(config, robot_name)?)
    }

    /// Underlying async client
    #[must_use]
    pub const fn inner(&self) -> &RobotClient {
        &self.inner
    }

    /// See [`RobotClient::send`]
    pub fn send(&self, payload: &OutboundPayload) -> Result<serde_json::Value, DingTalkError> {
        self.runtime.block_on(self.inner.send(payload))
    }

    /// See [`RobotClient::send_message`]
    pub fn send_message(&self, message: Message) -> Result<serde_json::Value, DingTalkError> {
        self.runtime.block_on(self.inner.send_message(message))
    }

    /// See [`RobotClient::send_text`]
    pub fn send_text(
        &self,
        content: &str,
        mobiles: &[&str],
        at_all: bool,
    ) -> Result<serde_json::Value, DingTalkError> {
        self.runtime
            .block_on(self.inner.send_text(content, mobiles, at_all))
    }

    /// See [`RobotClient::send_link`]
    pub fn send_link(
        &self,
        title: &str,
        text: &str,
        message_url: &str,
        pic_url: &str,
        mobiles: &[&str],
        at_all: bool,
    ) -> Result<serde_json::Value, DingTalkError> {
        self.runtime.block_on(
            self.inner
                .send_link(title, text, message_url, pic_url, mobiles, at_all),
        )
    }

    /// See [`RobotClient::send_markdown`]
    pub fn send_markdown(
        &self,
        title: &str,
        text: &str,
        mobiles: &[&str],
        at_all: bool,
    ) -> Result<serde_json::Value, DingTalkError> {
        self.runtime
            .block_on(self.inner.send_markdown(title, text, mobiles, at_all))
    }
}
