use std::fmt;

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};

/// Wall-clock format used both on disk and in rendered lines.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reserved sender name for join/leave announcements.
pub const SYSTEM_SENDER: &str = "System";

/// A chat message. Never mutated after creation.
///
/// Timestamps are local wall-clock time truncated to whole seconds, so a
/// message survives a trip through the history file unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    sender: String,
    content: String,
    #[serde(with = "timestamp_format")]
    timestamp: NaiveDateTime,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self::at(sender, content, Local::now().naive_local())
    }

    pub fn at(
        sender: impl Into<String>,
        content: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            timestamp: timestamp.trunc_subsecs(0),
        }
    }

    /// Announcement authored by the server itself.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(SYSTEM_SENDER, content)
    }

    pub fn joined(name: &str) -> Self {
        Self::system(format!("{} joined the chat", name))
    }

    pub fn left(name: &str) -> Self {
        Self::system(format!("{} left the chat", name))
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// Renders as `[YYYY-MM-DD HH:MM:SS] sender: content`.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.sender,
            self.content
        )
    }
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(D::Error::custom)
    }
}
