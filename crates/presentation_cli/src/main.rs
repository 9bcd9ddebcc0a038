//! DingTalk robot CLI
//!
//! Sends messages through configured robots from the command line.

#![allow(clippy::print_stdout)]

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use integration_dingtalk::{
    AtDirective, DEFAULT_ROBOT, DingTalkConfig, Link, Message, OutboundPayload, RobotClient,
    RobotCredential, RobotReply,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// DingTalk robot CLI
#[derive(Parser)]
#[command(name = "dingtalk-cli")]
#[command(author, version, about = "DingTalk robot CLI", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: ./dingtalk.toml if present)
    #[arg(short, long, env = "DINGTALK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Robot to send through
    #[arg(short, long, default_value = DEFAULT_ROBOT, global = true)]
    robot: String,

    #[command(subcommand)]
    command: Commands,
}

/// Who to mention
#[derive(Args, Debug, Default)]
struct MentionArgs {
    /// Mobile number to mention (repeatable)
    #[arg(long = "at", value_name = "MOBILE")]
    mobiles: Vec<String>,

    /// Mention everyone in the group
    #[arg(long)]
    at_all: bool,
}

impl MentionArgs {
    fn directive(&self) -> AtDirective {
        AtDirective::new(self.mobiles.iter().cloned(), self.at_all)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Send a text message
    Text {
        /// Message content
        content: String,

        #[command(flatten)]
        mentions: MentionArgs,
    },

    /// Send a link card
    Link {
        /// Card title
        title: String,

        /// Card summary
        text: String,

        /// URL opened when the card is clicked
        message_url: String,

        /// Thumbnail URL
        #[arg(long, default_value = "")]
        pic_url: String,

        #[command(flatten)]
        mentions: MentionArgs,
    },

    /// Send a markdown message
    ///
    /// Example: dingtalk-cli markdown "Deploy" "#### api\n- done" --at-all
    Markdown {
        /// Title shown in the conversation list
        title: String,

        /// Markdown source
        text: String,

        #[command(flatten)]
        mentions: MentionArgs,
    },

    /// List configured robots (secrets are never printed)
    Robots,
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Payload for a send command, `None` for commands that do not send
fn build_payload(command: &Commands) -> Option<OutboundPayload> {
    match command {
        Commands::Text { content, mentions } => {
            Some(Message::text(content.as_str()).into_body().with_at(mentions.directive()))
        },
        Commands::Link {
            title,
            text,
            message_url,
            pic_url,
            mentions,
        } => {
            let link = Link::new(title.as_str(), text.as_str(), message_url.as_str())
                .with_pic_url(pic_url.as_str());
            Some(Message::from(link).into_body().with_at(mentions.directive()))
        },
        Commands::Markdown {
            title,
            text,
            mentions,
        } => Some(
            Message::markdown(title.as_str(), text.as_str())
                .into_body()
                .with_at(mentions.directive()),
        ),
        Commands::Robots => None,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DingTalkConfig> {
    let config = match path {
        Some(path) => DingTalkConfig::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => DingTalkConfig::load().context("failed to load DingTalk configuration")?,
    };
    Ok(config)
}

#[derive(Serialize)]
struct RobotSummary {
    signed: bool,
}

#[derive(Serialize)]
struct ConfigSummary<'a> {
    base_url: &'a str,
    timeout_secs: u64,
    robots: BTreeMap<&'a str, RobotSummary>,
}

fn summarize(config: &DingTalkConfig) -> ConfigSummary<'_> {
    let robots = config
        .robots
        .iter()
        .map(|(name, entry)| {
            let signed = RobotCredential::from(entry).is_signed();
            (name.as_str(), RobotSummary { signed })
        })
        .collect();

    ConfigSummary {
        base_url: &config.base_url,
        timeout_secs: config.timeout_secs,
        robots,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = log_filter_from_verbosity(cli.verbose);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(cli.config.as_deref())?;

    let Some(payload) = build_payload(&cli.command) else {
        if config.robots.is_empty() {
            println!("No robots configured.");
        }
        println!("{}", toml::to_string_pretty(&summarize(&config))?);
        return Ok(());
    };

    let client = RobotClient::from_config(&config, &cli.robot)?;
    info!(robot = %cli.robot, msgtype = %payload.msg_type(), "Sending message");

    let reply = client.send(&payload).await?;
    println!("{}", serde_json::to_string_pretty(&reply)?);

    match RobotReply::from_value(&reply) {
        Some(status) if status.is_success() => println!("✅ Delivered"),
        Some(status) => println!("⚠️  Rejected: {} ({})", status.errmsg, status.errcode),
        None => {},
    }

    Ok(())
}
