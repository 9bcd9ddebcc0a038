//! DingTalk custom robot integration
//!
//! Sends text, link and markdown messages to a DingTalk group robot via its
//! webhook, signing requests when the robot has a secret configured.
//!
//! # Architecture
//!
//! ```text
//! Message ──► OutboundPayload ──► RobotClient ──► HttpTransport ──► oapi.dingtalk.com
//!   (+ AtDirective)                 (URL + sign)     (reqwest)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use integration_dingtalk::{DingTalkConfig, Message, RobotClient, RobotReply};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DingTalkConfig::load()?;
//! let client = RobotClient::from_config(&config, "default")?;
//!
//! let reply = client
//!     .send(&Message::text("Deploy finished").attach_at(["13800000000"], false))
//!     .await?;
//!
//! if let Some(status) = RobotReply::from_value(&reply) {
//!     println!("errcode: {}", status.errcode);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod blocking;
pub mod client;
pub mod config;
mod error;
pub mod message;
pub mod signing;
pub mod transport;

pub use blocking::BlockingRobotClient;
pub use client::{RobotClient, RobotReply};
pub use config::{
    DEFAULT_BASE_URL, DEFAULT_ROBOT, DEFAULT_TIMEOUT_SECS, DingTalkConfig, RobotCredential,
    RobotEntry, resolve_credential,
};
pub use error::DingTalkError;
pub use message::{AtDirective, Link, Markdown, Message, MessageType, OutboundPayload, Text};
pub use signing::{Clock, FixedClock, Signature, SystemClock};
pub use transport::{HttpTransport, ReqwestTransport, TransportResponse};
