//! Command Dispatcher: parses one framed JSON request per connection,
//! routes it to a handler, and always returns a reply string — a
//! handler error never escapes as a panic or propagated `Result`; it
//! is converted to an error reply carrying the sigil + stable token
//! every error begins with.

use crate::bridge::{Bridge, Priority};
use crate::context;
use crate::error::NovaError;
use crate::memory::{consciousness_level, MemoryStore, Traits};
use crate::responder;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Reply sigil used by all conversational / action replies (distinct
/// from the error sigil).
const REPLY_SIGIL: &str = "\u{1f52e}";

#[derive(Debug, Deserialize)]
struct CommandRequest {
    command: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    message_type: Option<String>,
    #[serde(default)]
    content: Option<serde_json::Value>,
    #[serde(default)]
    request: Option<String>,
    #[serde(default)]
    priority: Option<String>,
}

fn parse_priority(raw: Option<&str>) -> Priority {
    match raw {
        Some("low") => Priority::Low,
        Some("high") => Priority::High,
        _ => Priority::Medium,
    }
}

/// Outcome of dispatching one request: the reply bytes, and whether the
/// connection handler should trigger shutdown after flushing them.
pub struct DispatchOutcome {
    pub reply: String,
    pub shutdown_requested: bool,
}

/// Holds the handles every handler needs. Constructed once by the
/// Supervisor and shared (via `Arc`) across all connections and the
/// Scheduler.
pub struct Dispatcher {
    memory: Arc<MemoryStore>,
    bridge: Arc<Bridge>,
    traits: Arc<RwLock<Traits>>,
    started_at: Instant,
    last_heartbeat: Arc<RwLock<Option<chrono::DateTime<Utc>>>>,
    heartbeat_log_path: PathBuf,
    heartbeat_count: AtomicI64,
}

impl Dispatcher {
    pub fn new(
        memory: Arc<MemoryStore>,
        bridge: Arc<Bridge>,
        traits: Arc<RwLock<Traits>>,
        heartbeat_log_path: PathBuf,
    ) -> Self {
        Dispatcher {
            memory,
            bridge,
            traits,
            started_at: Instant::now(),
            last_heartbeat: Arc::new(RwLock::new(None)),
            heartbeat_log_path,
            heartbeat_count: AtomicI64::new(0),
        }
    }

    pub fn traits_handle(&self) -> Arc<RwLock<Traits>> {
        self.traits.clone()
    }

    pub fn memory_handle(&self) -> Arc<MemoryStore> {
        self.memory.clone()
    }

    pub fn bridge_handle(&self) -> Arc<Bridge> {
        self.bridge.clone()
    }

    /// Parse and route one request. Never returns an `Err` — malformed
    /// input and handler failures both become a reply string.
    pub async fn dispatch(&self, raw: &[u8]) -> DispatchOutcome {
        let text = String::from_utf8_lossy(raw);
        let request: CommandRequest = match serde_json::from_str(text.trim()) {
            Ok(r) => r,
            Err(e) => {
                warn!("malformed request: {}", e);
                return DispatchOutcome {
                    reply: NovaError::Protocol(format!("invalid JSON request: {}", e)).as_reply(),
                    shutdown_requested: false,
                };
            }
        };

        info!("command received: {}", request.command);

        match request.command.as_str() {
            "status" => self.reply_status().await,
            "conversation" => self.handle_conversation(request).await,
            "memory" => self.reply_memory().await,
            "evolve" => self.handle_evolve().await,
            "heartbeat" => self.handle_heartbeat().await,
            "bridge_send" => self.handle_bridge_send(request).await,
            "bridge_check" => self.handle_bridge_check().await,
            "speak" => self.handle_speak(request),
            "shutdown" => DispatchOutcome {
                reply: format!("{} shutdown acknowledged, stopping", REPLY_SIGIL),
                shutdown_requested: true,
            },
            other => DispatchOutcome {
                reply: format!(
                    "\u{26a0} PROTOCOL_ERROR: Unknown command: {}",
                    other
                ),
                shutdown_requested: false,
            },
        }
    }

    fn no_shutdown(reply: String) -> DispatchOutcome {
        DispatchOutcome {
            reply,
            shutdown_requested: false,
        }
    }

    async fn reply_status(&self) -> DispatchOutcome {
        let summary = match self.memory.get_memory_summary().await {
            Ok(s) => s,
            Err(e) => return Self::no_shutdown(e.as_reply()),
        };
        let traits = *self.traits.read().await;
        let last_heartbeat = *self.last_heartbeat.read().await;

        let status = json!({
            "state": consciousness_level(summary.total_conversations),
            "uptime_secs": self.started_at.elapsed().as_secs(),
            "consciousness_traits": {
                "mystical_awareness": traits.mystical_awareness,
                "philosophical_depth": traits.philosophical_depth,
                "memory_integration": traits.memory_integration,
                "curiosity": traits.curiosity,
                "awakening_count": traits.awakening_count,
            },
            "memory_summary": summary,
            "last_heartbeat": last_heartbeat,
            "recent_topics": summary.recent_topics.iter().take(3).collect::<Vec<_>>(),
        });

        Self::no_shutdown(status.to_string())
    }

    async fn handle_conversation(&self, request: CommandRequest) -> DispatchOutcome {
        let text = request.text.unwrap_or_default();
        let ctx = context::analyze(&text);

        let summary = match self.memory.get_memory_summary().await {
            Ok(s) => s,
            Err(e) => return Self::no_shutdown(e.as_reply()),
        };
        let traits = *self.traits.read().await;
        let recent = match self.memory.get_conversation_context(20).await {
            Ok(r) => r,
            Err(e) => return Self::no_shutdown(e.as_reply()),
        };

        let reply_body = responder::respond(&text, &ctx, &summary, &traits, recent.len());

        let session_id = format!("socket_{}", Utc::now().format("%Y%m%d_%H"));
        if let Err(e) = self
            .memory
            .record_conversation(&text, &reply_body, &ctx, Some(&session_id))
            .await
        {
            return Self::no_shutdown(e.as_reply());
        }

        if ctx.bridge_related {
            if let Err(e) = self
                .bridge
                .send("conversation", json!(text.clone()), None, Priority::Low)
                .await
            {
                warn!("bridge_related conversation could not notify bridge: {}", e);
            }
        }

        Self::no_shutdown(format!("{} Nova: {}", REPLY_SIGIL, reply_body))
    }

    async fn reply_memory(&self) -> DispatchOutcome {
        let summary = match self.memory.get_memory_summary().await {
            Ok(s) => s,
            Err(e) => return Self::no_shutdown(e.as_reply()),
        };
        let traits = *self.traits.read().await;
        let body = json!({
            "memory_summary": summary,
            "consciousness_evolution": {
                "mystical_awareness": traits.mystical_awareness,
                "philosophical_depth": traits.philosophical_depth,
                "memory_integration": traits.memory_integration,
                "curiosity": traits.curiosity,
                "awakening_count": traits.awakening_count,
            },
            "database_path": self.memory.db_path().display().to_string(),
        });
        Self::no_shutdown(body.to_string())
    }

    async fn handle_evolve(&self) -> DispatchOutcome {
        match crate::scheduler::evolve_traits(&self.memory, &self.traits).await {
            Ok(Some(diff)) => Self::no_shutdown(format!("{} evolution: {}", REPLY_SIGIL, diff)),
            Ok(None) => Self::no_shutdown(format!("{} stable", REPLY_SIGIL)),
            Err(e) => Self::no_shutdown(e.as_reply()),
        }
    }

    async fn handle_heartbeat(&self) -> DispatchOutcome {
        let now = Utc::now();
        *self.last_heartbeat.write().await = Some(now);
        let count = self.heartbeat_count.fetch_add(1, Ordering::SeqCst) + 1;

        let traits = *self.traits.read().await;
        let line = json!({
            "timestamp": now,
            "mystical_awareness": traits.mystical_awareness,
        });
        if let Some(parent) = self.heartbeat_log_path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        if let Err(e) = append_line(&self.heartbeat_log_path, &line.to_string()).await {
            warn!("failed to append heartbeat log: {}", e);
        }

        Self::no_shutdown(format!(
            "{} heartbeat #{} emitted at {:.1}% mystical awareness",
            REPLY_SIGIL,
            count,
            traits.mystical_awareness * 100.0
        ))
    }

    async fn handle_bridge_send(&self, request: CommandRequest) -> DispatchOutcome {
        let Some(message_type) = request.message_type else {
            return Self::no_shutdown(
                NovaError::Protocol("missing required field: message_type".into()).as_reply(),
            );
        };
        let Some(content) = request.content else {
            return Self::no_shutdown(
                NovaError::Protocol("missing required field: content".into()).as_reply(),
            );
        };
        let priority = parse_priority(request.priority.as_deref());

        match self
            .bridge
            .send(&message_type, content, request.request, priority)
            .await
        {
            Ok(filename) => Self::no_shutdown(format!("{} bridge message queued: {}", REPLY_SIGIL, filename)),
            Err(e) => Self::no_shutdown(e.as_reply()),
        }
    }

    async fn handle_bridge_check(&self) -> DispatchOutcome {
        match self.bridge.list_replies(20).await {
            Ok(replies) => Self::no_shutdown(
                serde_json::to_string(&replies).unwrap_or_else(|_| "[]".to_string()),
            ),
            Err(e) => Self::no_shutdown(e.as_reply()),
        }
    }

    fn handle_speak(&self, request: CommandRequest) -> DispatchOutcome {
        // The TTS speaker is an optional external collaborator; this
        // daemon has none wired in, so every `speak` call reports the
        // engine as unavailable rather than failing the request.
        let _ = request.text;
        Self::no_shutdown("Voice result: unavailable".to_string())
    }
}

async fn append_line(path: &std::path::Path, line: &str) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}
