//! wxbridge CLI entry point.
//!
//! Provides `start` to run the bridge and print host events as JSON lines,
//! plus one-shot `status`, `contacts`, and `send` subcommands.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::RwLock;
use tracing::{info, warn};

use wxbridge::backend::client::BackendClient;
use wxbridge::bridge::composer::OutboundComposer;
use wxbridge::bridge::contacts::ContactDirectory;
use wxbridge::bridge::host::{ChannelBus, HostEvent};
use wxbridge::bridge::segment::{OutboundMessage, Segment};
use wxbridge::config::BridgeConfig;

/// wxbridge: message bridge for a MimicWX backend.
#[derive(Parser)]
#[command(name = "wxbridge", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the bridge until interrupted.
    Start,
    /// Print the backend login status.
    Status,
    /// Print the backend contact snapshot.
    Contacts,
    /// Send one message.
    Send {
        /// Recipient identifier.
        #[arg(long)]
        to: String,
        /// Text to send.
        #[arg(long)]
        text: Option<String>,
        /// Image reference (path, `file://`, `http(s)://`, or `base64://`). Repeatable.
        #[arg(long)]
        image: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Start => handle_start().await,
        Command::Status => {
            wxbridge::logging::init_cli();
            handle_status().await
        }
        Command::Contacts => {
            wxbridge::logging::init_cli();
            handle_contacts().await
        }
        Command::Send { to, text, image } => {
            wxbridge::logging::init_cli();
            handle_send(&to, text, image).await
        }
    }
}

fn load() -> anyhow::Result<(BridgeConfig, Option<String>)> {
    let config = BridgeConfig::load().context("failed to load configuration")?;
    let token = config
        .backend
        .resolve_token()
        .context("failed to resolve backend token")?;
    Ok((config, token))
}

/// Run the bridge and print every host event.
async fn handle_start() -> anyhow::Result<()> {
    let (config, token) = load()?;
    let _logging_guard = wxbridge::logging::init_production(&config.logging.logs_dir)?;

    let (bus, mut events) = ChannelBus::new();
    let handle = wxbridge::bridge::connect(&config, token, Arc::new(bus));
    info!(session = %config.bridge.session_id, "wxbridge started");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    warn!("event channel closed");
                    break;
                };
                print_event(&event);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received shutdown signal");
                break;
            }
        }
    }

    handle.shutdown();
    info!("wxbridge stopped");
    Ok(())
}

fn print_event(event: &HostEvent) {
    let data = match event {
        HostEvent::Connect { session_id } => serde_json::json!({ "session_id": session_id }),
        HostEvent::Message(message) => {
            serde_json::to_value(message.as_ref()).unwrap_or(serde_json::Value::Null)
        }
    };
    println!(
        "{}",
        serde_json::json!({ "event": event.name(), "data": data })
    );
}

async fn handle_status() -> anyhow::Result<()> {
    let (config, token) = load()?;
    let client = BackendClient::from_config(&config.backend, token);
    let status = client.status().await.context("status request failed")?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn handle_contacts() -> anyhow::Result<()> {
    let (config, token) = load()?;
    let client = BackendClient::from_config(&config.backend, token);
    let entries = client.contacts().await.context("contacts request failed")?;

    let mut directory = ContactDirectory::new(config.bridge.group_marker.clone());
    directory.upsert_from_snapshot(&entries);
    let listing = serde_json::json!({
        "friends": directory.friends(),
        "groups": directory.groups(),
    });
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

async fn handle_send(to: &str, text: Option<String>, images: Vec<String>) -> anyhow::Result<()> {
    let (config, token) = load()?;
    let client = BackendClient::from_config(&config.backend, token);
    let directory = Arc::new(RwLock::new(ContactDirectory::new(
        config.bridge.group_marker.clone(),
    )));
    let composer = OutboundComposer::new(
        Arc::new(client),
        directory,
        config.bridge.max_forward_depth,
    );

    let mut segments: Vec<Segment> = text.into_iter().map(Segment::text).collect();
    segments.extend(images.into_iter().map(Segment::image));
    if segments.is_empty() {
        anyhow::bail!("nothing to send: pass --text and/or --image");
    }

    let report = composer
        .compose(to, &OutboundMessage::Segments(segments))
        .await?;
    info!(to, delivered = report.delivered, failed = report.failed, "send finished");
    if report.failed > 0 {
        anyhow::bail!("{} of the sends failed", report.failed);
    }
    Ok(())
}
