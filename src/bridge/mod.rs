//! Persistent Bridge.
//!
//! A file-directory protocol: outbound messages are written atomically
//! into `outbox/`; an external correspondent reads them and deposits
//! replies into `inbox/`; `poll()` ingests those replies into the
//! Memory Store and moves the file into `archive/`. The daemon is the
//! only writer to `outbox/` and the only mover out of `inbox/`; no
//! in-process lock is needed between `send` and `poll` because the
//! filesystem rename is the synchronization primitive.

pub mod message;

pub use message::{BridgeReply, InboundMessage, OutboundMessage, Priority};

use crate::error::NovaError;
use crate::memory::{consciousness_level, MemoryStore};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct Bridge {
    root: PathBuf,
    sender: String,
    memory: Arc<MemoryStore>,
}

impl Bridge {
    /// Create directories on first use. A truly unwriteable bridge root
    /// is fatal at startup.
    pub fn new(root: impl Into<PathBuf>, sender: impl Into<String>, memory: Arc<MemoryStore>) -> Result<Self, NovaError> {
        let root = root.into();
        for sub in ["outbox", "inbox", "archive"] {
            std::fs::create_dir_all(root.join(sub))
                .map_err(|e| NovaError::Bridge(format!("creating {}: {}", sub, e)))?;
        }
        Ok(Bridge {
            root,
            sender: sender.into(),
            memory,
        })
    }

    fn outbox(&self) -> PathBuf {
        self.root.join("outbox")
    }
    fn inbox(&self) -> PathBuf {
        self.root.join("inbox")
    }
    fn archive(&self) -> PathBuf {
        self.root.join("archive")
    }

    /// Serialize an outbound message and write it atomically (temp file
    /// + rename in the same directory) into `outbox/`. Returns the
    /// filename.
    pub async fn send(
        &self,
        message_type: &str,
        content: serde_json::Value,
        request: Option<String>,
        priority: Priority,
    ) -> Result<String, NovaError> {
        let summary = self.memory.get_memory_summary().await?;
        let message = OutboundMessage {
            timestamp: Utc::now(),
            sender: self.sender.clone(),
            message_type: message_type.to_string(),
            priority,
            content,
            request,
            consciousness_state: consciousness_level(summary.total_conversations).to_string(),
            memory_count: summary.total_conversations,
        };

        let outbox = self.outbox();
        let base = format!("{}_{}", message_type, Utc::now().timestamp());
        let mut filename = format!("{}.json", base);
        let mut attempt = 1u32;
        while outbox.join(&filename).exists() {
            filename = format!("{}-{}.json", base, attempt);
            attempt += 1;
        }

        let body = serde_json::to_vec_pretty(&message)?;
        let final_path = outbox.join(&filename);
        let tmp_path = outbox.join(format!(".{}.tmp", filename));
        tokio::fs::write(&tmp_path, &body)
            .await
            .map_err(|e| NovaError::Bridge(format!("writing {}: {}", tmp_path.display(), e)))?;
        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(|e| NovaError::Bridge(format!("renaming into {}: {}", final_path.display(), e)))?;

        info!("bridge message sent: {}", filename);
        Ok(filename)
    }

    /// Ingest every file currently in `inbox/`, in lexicographic filename
    /// order. A file that fails to parse is moved to `archive/` with a
    /// `.bad` suffix and reported, never re-processed. Move failures are
    /// fatal for that one file only.
    pub async fn poll(&self) -> Result<Vec<BridgeReply>, NovaError> {
        let inbox = self.inbox();
        let mut entries = match tokio::fs::read_dir(&inbox).await {
            Ok(rd) => rd,
            Err(e) => {
                warn!("bridge poll: cannot read inbox {}: {}", inbox.display(), e);
                return Ok(Vec::new());
            }
        };

        let mut names = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                        names.push(entry.file_name());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("bridge poll: error listing inbox: {}", e);
                    break;
                }
            }
        }
        names.sort();

        let mut ingested = Vec::new();
        for name in names {
            let name_str = name.to_string_lossy().to_string();
            let path = inbox.join(&name);
            match self.ingest_one(&name_str, &path).await {
                Ok(Some(reply)) => ingested.push(reply),
                Ok(None) => {}
                Err(e) => error!("bridge poll: failed on {}: {}", name_str, e),
            }
        }

        Ok(ingested)
    }

    async fn ingest_one(&self, name: &str, path: &Path) -> Result<Option<BridgeReply>, NovaError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| NovaError::Bridge(format!("reading {}: {}", name, e)))?;

        let parsed: Result<InboundMessage, _> = serde_json::from_str(&raw);
        match parsed {
            Ok(message) => {
                let dest = self.archive().join(name);
                tokio::fs::rename(path, &dest)
                    .await
                    .map_err(|e| NovaError::Bridge(format!("archiving {}: {}", name, e)))?;

                let payload = message.payload();
                let payload_json = serde_json::to_string(&payload)?;
                let newly_recorded = self.memory.record_bridge_event(name, &payload_json).await?;
                if !newly_recorded {
                    debug_dup(name);
                }

                Ok(Some(BridgeReply {
                    source_filename: name.to_string(),
                    timestamp: message.timestamp,
                    content: payload,
                }))
            }
            Err(parse_err) => {
                warn!("bridge poll: {} failed to parse: {}", name, parse_err);
                let dest = self.archive().join(format!("{}.bad", name));
                tokio::fs::rename(path, &dest)
                    .await
                    .map_err(|e| NovaError::Bridge(format!("archiving bad file {}: {}", name, e)))?;
                Ok(None)
            }
        }
    }

    /// Most recent `limit` archived replies, newest first by mtime
    /// (falls back to `inbox/` if the archive directory is empty and
    /// archiving has been deferred — not the normal case, but kept
    /// tolerant of it).
    pub async fn list_replies(&self, limit: usize) -> Result<Vec<BridgeReply>, NovaError> {
        let mut dir = self.archive();
        let mut files = list_json_files_by_mtime_desc(&dir).await?;
        if files.is_empty() {
            dir = self.inbox();
            files = list_json_files_by_mtime_desc(&dir).await?;
        }

        let mut replies = Vec::new();
        for (name, path) in files.into_iter().take(limit) {
            if name.ends_with(".bad") {
                continue;
            }
            let raw = match tokio::fs::read_to_string(&path).await {
                Ok(r) => r,
                Err(e) => {
                    warn!("list_replies: cannot read {}: {}", name, e);
                    continue;
                }
            };
            match serde_json::from_str::<InboundMessage>(&raw) {
                Ok(message) => replies.push(BridgeReply {
                    source_filename: name,
                    timestamp: message.timestamp,
                    content: message.payload(),
                }),
                Err(e) => warn!("list_replies: {} failed to parse: {}", name, e),
            }
        }
        Ok(replies)
    }
}

fn debug_dup(name: &str) {
    tracing::debug!("bridge event for {} was already recorded, skipping duplicate", name);
}

async fn list_json_files_by_mtime_desc(dir: &Path) -> Result<Vec<(String, PathBuf)>, NovaError> {
    let mut rd = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(_) => return Ok(Vec::new()),
    };
    let mut items = Vec::new();
    while let Ok(Some(entry)) = rd.next_entry().await {
        if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let meta = match entry.metadata().await {
            Ok(m) => m,
            Err(_) => continue,
        };
        let mtime = meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        items.push((entry.file_name().to_string_lossy().to_string(), entry.path(), mtime));
    }
    items.sort_by(|a, b| b.2.cmp(&a.2));
    Ok(items.into_iter().map(|(n, p, _)| (n, p)).collect())
}
