use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lobby_types::models::Message;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Append-only chat history backed by a JSON file.
///
/// The whole history lives in memory; every append rewrites the file.
/// A failed write leaves the in-memory append in place, and the next
/// successful append brings the file back in sync.
pub struct MessageLog {
    path: PathBuf,
    messages: Mutex<Vec<Message>>,
}

impl MessageLog {
    /// Load history from `path`. Missing or malformed files start empty.
    pub fn load_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let messages = match read_history(&path) {
            Ok(messages) => {
                info!("Loaded {} messages from {}", messages.len(), path.display());
                messages
            }
            Err(LoadError::Missing) => {
                info!("No history at {}, starting empty", path.display());
                Vec::new()
            }
            Err(LoadError::Malformed(reason)) => {
                warn!("Ignoring unreadable history at {}: {}", path.display(), reason);
                Vec::new()
            }
        };

        Self {
            path,
            messages: Mutex::new(messages),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a message and persist the full history.
    ///
    /// The lock is held across the write so concurrent appends never
    /// interleave on disk.
    pub fn append(&self, message: Message) -> Result<(), PersistError> {
        let mut messages = self.lock();
        messages.push(message);
        write_history(&self.path, &messages)?;
        debug!("History persisted ({} messages)", messages.len());
        Ok(())
    }

    pub fn all(&self) -> Vec<Message> {
        self.lock().clone()
    }

    /// The last `count` messages, oldest first.
    pub fn recent(&self, count: usize) -> Vec<Message> {
        let messages = self.lock();
        let start = messages.len().saturating_sub(count);
        messages[start..].to_vec()
    }

    /// Messages at positions `cursor..`, plus the cursor to pass next time.
    pub fn since(&self, cursor: usize) -> (Vec<Message>, usize) {
        let messages = self.lock();
        let start = cursor.min(messages.len());
        (messages[start..].to_vec(), messages.len())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum LoadError {
    Missing,
    Malformed(String),
}

fn read_history(path: &Path) -> Result<Vec<Message>, LoadError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(LoadError::Missing),
        Err(e) => return Err(LoadError::Malformed(e.to_string())),
    };
    serde_json::from_str(&raw).map_err(|e| LoadError::Malformed(e.to_string()))
}

fn write_history(path: &Path, messages: &[Message]) -> Result<(), PersistError> {
    let json = serde_json::to_string_pretty(messages)?;
    fs::write(path, json).map_err(|source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("lobby-history-{}.json", Uuid::new_v4()))
    }

    fn msg(sender: &str, content: &str, second: u32) -> Message {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, second)
            .unwrap();
        Message::at(sender, content, ts)
    }

    #[test]
    fn missing_file_starts_empty() {
        let log = MessageLog::load_or_empty(temp_path());
        assert!(log.is_empty());
        assert!(log.all().is_empty());
    }

    #[test]
    fn malformed_file_starts_empty() {
        let path = temp_path();
        fs::write(&path, "{ not json").unwrap();

        let log = MessageLog::load_or_empty(&path);
        assert!(log.is_empty());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn append_persists_and_reloads_in_order() {
        let path = temp_path();
        let log = MessageLog::load_or_empty(&path);
        log.append(msg("alice", "hi", 1)).unwrap();
        log.append(msg("bob", "hello", 2)).unwrap();
        log.append(msg("alice", "bye", 3)).unwrap();

        let reloaded = MessageLog::load_or_empty(&path);
        assert_eq!(reloaded.all(), log.all());
        let contents: Vec<_> = reloaded.all().iter().map(|m| m.content().to_string()).collect();
        assert_eq!(contents, ["hi", "hello", "bye"]);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn file_is_a_plain_record_array() {
        let path = temp_path();
        let log = MessageLog::load_or_empty(&path);
        log.append(msg("Сара", "сайн уу", 5)).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"timestamp\": \"2024-01-02 10:00:05\""));
        assert!(raw.contains("сайн уу"));

        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value.as_array().map(|a| a.len()), Some(1));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn failed_write_keeps_in_memory_append() {
        let path = std::env::temp_dir()
            .join(format!("lobby-missing-{}", Uuid::new_v4()))
            .join("history.json");
        let log = MessageLog::load_or_empty(&path);

        let result = log.append(msg("alice", "lost on disk", 1));
        assert!(matches!(result, Err(PersistError::Write { .. })));
        assert_eq!(log.len(), 1);
        assert!(!path.exists());
    }

    #[test]
    fn recent_and_since_windows() {
        let log = MessageLog::load_or_empty(
            std::env::temp_dir()
                .join(format!("lobby-missing-{}", Uuid::new_v4()))
                .join("history.json"),
        );
        for i in 0..5 {
            let _ = log.append(msg("a", &format!("m{}", i), i));
        }

        let recent: Vec<_> = log.recent(2).iter().map(|m| m.content().to_string()).collect();
        assert_eq!(recent, ["m3", "m4"]);
        assert_eq!(log.recent(50).len(), 5);

        let (tail, next) = log.since(3);
        assert_eq!(tail.len(), 2);
        assert_eq!(next, 5);

        let (none, next) = log.since(99);
        assert!(none.is_empty());
        assert_eq!(next, 5);
    }
}
