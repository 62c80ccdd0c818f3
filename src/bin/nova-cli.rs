//! Thin CLI collaborator for the daemon's socket protocol.
//!
//! Connects to the daemon's UNIX socket, sends one framed JSON request,
//! prints the reply, and exits. Has no special access to the database or
//! bridge directory — it is a consumer of the socket protocol like any
//! other collaborator (file watcher, TTS speaker, web dashboard).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

#[derive(Parser, Debug)]
#[command(name = "nova-cli", version, about = "Talk to the novad daemon over its UNIX socket")]
struct Args {
    /// Path to the daemon's UNIX socket.
    #[arg(long, default_value = "/tmp/nova_socket")]
    socket: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query daemon status (uptime, traits, memory summary).
    Status,
    /// Send a conversational utterance.
    Say {
        /// The text to send.
        text: String,
    },
    /// Fetch the memory summary.
    Memory,
    /// Force an evolution tick.
    Evolve,
    /// Send a heartbeat.
    Heartbeat,
    /// Queue a message for the bridge's external correspondent.
    BridgeSend {
        message_type: String,
        content: String,
        #[arg(long)]
        request: Option<String>,
    },
    /// List the most recent bridge replies.
    BridgeCheck,
    /// Hand text to the external text-to-speech collaborator, if wired in.
    Speak {
        /// The text to speak.
        text: String,
    },
    /// Ask for graceful shutdown.
    Shutdown,
}

fn request_payload(command: &Command) -> serde_json::Value {
    match command {
        Command::Status => json!({ "command": "status" }),
        Command::Say { text } => json!({ "command": "conversation", "text": text }),
        Command::Memory => json!({ "command": "memory" }),
        Command::Evolve => json!({ "command": "evolve" }),
        Command::Heartbeat => json!({ "command": "heartbeat" }),
        Command::BridgeSend {
            message_type,
            content,
            request,
        } => json!({
            "command": "bridge_send",
            "message_type": message_type,
            "content": content,
            "request": request,
        }),
        Command::BridgeCheck => json!({ "command": "bridge_check" }),
        Command::Speak { text } => json!({ "command": "speak", "text": text }),
        Command::Shutdown => json!({ "command": "shutdown" }),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let payload = request_payload(&args.command);
    let body = serde_json::to_vec(&payload)?;

    let mut stream = UnixStream::connect(&args.socket)
        .await
        .with_context(|| format!("connecting to {}", args.socket.display()))?;
    stream.write_all(&body).await.context("writing request")?;
    stream.shutdown().await.ok();

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.context("reading reply")?;
    println!("{}", String::from_utf8_lossy(&reply));
    Ok(())
}
