//! Append-only usage logger
//!
//! Fire-and-forget: callers hand entries to [`UsageLogger::track`], which
//! never blocks and never fails. A background task appends one JSON line
//! per entry to the configured file, or emits it as a log line when no file
//! is configured.

use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Entries buffered before new ones are dropped
pub const CHANNEL_BUFFER: usize = 1_024;

/// One usage record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageEntry {
    /// RFC 3339 UTC timestamp, assigned on creation
    pub when: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UsageEntry {
    /// Entry for an answered question
    pub fn answered(question: &str, answer: &str, cid: &str) -> Self {
        Self {
            when: now(),
            question: Some(question.to_string()),
            answer: Some(answer.to_string()),
            cid: Some(cid.to_string()),
            extra: Map::new(),
        }
    }

    /// Entry from a client-reported object
    ///
    /// String `question`, `answer` and `cid` fields are lifted out; everything
    /// else is kept verbatim. A client-supplied `when` is replaced.
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        fields.remove("when");
        let mut take = |key: &str| match fields.remove(key) {
            Some(Value::String(text)) => Some(text),
            Some(other) => {
                fields.insert(key.to_string(), other);
                None
            }
            None => None,
        };

        let question = take("question");
        let answer = take("answer");
        let cid = take("cid");

        Self {
            when: now(),
            question,
            answer,
            cid,
            extra: fields,
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

enum Command {
    Record(UsageEntry),
    Flush(oneshot::Sender<()>),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Record(entry) => f.debug_tuple("Record").field(entry).finish(),
            Command::Flush(_) => f.write_str("Flush"),
        }
    }
}

/// Handle to the background usage writer
#[derive(Debug, Clone)]
pub struct UsageLogger {
    sender: mpsc::Sender<Command>,
}

impl UsageLogger {
    /// Create a logger, spawning its background writer
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(path: Option<PathBuf>) -> Self {
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER);
        tokio::spawn(background_writer(path, receiver));
        Self { sender }
    }

    /// Queue an entry; drops it with a warning if the writer is backed up
    pub fn track(&self, entry: UsageEntry) {
        if let Err(e) = self.sender.try_send(Command::Record(entry)) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    warn!("Usage log channel full, dropping entry");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    error!("Usage log channel closed, dropping entry");
                }
            }
        }
    }

    /// Wait until every entry queued before this call has been written
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(Command::Flush(ack)).await.is_ok() {
            let _ = done.await;
        }
    }
}

async fn background_writer(path: Option<PathBuf>, mut receiver: mpsc::Receiver<Command>) {
    info!(path = ?path, "Starting usage log writer");

    let mut file: Option<File> = None;

    while let Some(command) = receiver.recv().await {
        let entry = match command {
            Command::Record(entry) => entry,
            Command::Flush(ack) => {
                if let Some(file) = file.as_mut() {
                    if let Err(e) = file.flush().await {
                        error!(error = %e, "Failed to flush usage log");
                    }
                }
                let _ = ack.send(());
                continue;
            }
        };

        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "Failed to serialize usage entry");
                continue;
            }
        };

        let Some(path) = path.as_ref() else {
            info!(usage = %line, "Usage");
            continue;
        };

        if file.is_none() {
            match OpenOptions::new().create(true).append(true).open(path).await {
                Ok(opened) => file = Some(opened),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to open usage log");
                    continue;
                }
            }
        }

        if let Some(handle) = file.as_mut() {
            let write = async {
                handle.write_all(line.as_bytes()).await?;
                handle.write_all(b"\n").await
            };
            match write.await {
                Ok(()) => debug!(cid = ?entry.cid, "Usage entry written"),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to write usage entry");
                    file = None;
                }
            }
        }
    }

    debug!("Usage log writer stopped");
}
