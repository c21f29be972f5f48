use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use lobby_store::MessageLog;
use lobby_types::models::Message;

use crate::broadcaster::{Broadcaster, DEFAULT_PENDING_LIMIT};
use crate::error::ChatError;
use crate::presence::PresenceTracker;
use crate::sessions::SessionRegistry;

/// Participants idle this long are removed by the sweep.
pub const DEFAULT_INACTIVITY: Duration = Duration::from_secs(5 * 60);

/// What a poller gets back: rendered lines plus who is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    pub messages: Vec<String>,
    pub users: Vec<String>,
    /// Set for cursor reads only.
    pub cursor: Option<usize>,
}

/// A successful login: the session id to hand out and the trimmed name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub name: String,
}

/// The chat service: presence, history and delivery behind one handle.
#[derive(Clone)]
pub struct Chat {
    inner: Arc<ChatInner>,
}

struct ChatInner {
    presence: PresenceTracker,
    sessions: SessionRegistry,
    broadcaster: Broadcaster,
    inactivity: TimeDelta,
}

impl Chat {
    pub fn new(log: MessageLog, inactivity: Duration) -> Self {
        Self::with_pending_limit(log, inactivity, DEFAULT_PENDING_LIMIT)
    }

    /// `pending_limit` caps how many undrained messages are kept for pollers.
    pub fn with_pending_limit(log: MessageLog, inactivity: Duration, pending_limit: usize) -> Self {
        let inactivity = TimeDelta::from_std(inactivity).unwrap_or(TimeDelta::MAX);
        Self {
            inner: Arc::new(ChatInner {
                presence: PresenceTracker::new(),
                sessions: SessionRegistry::new(),
                broadcaster: Broadcaster::with_limit(log, pending_limit),
                inactivity,
            }),
        }
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.inner.presence
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.inner.broadcaster
    }

    pub fn inactivity(&self) -> TimeDelta {
        self.inner.inactivity
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    /// Join the chat and open a session for the trimmed name.
    pub fn login(&self, name: &str) -> Result<Session, ChatError> {
        let name = require_name(name, ChatError::EmptyName)?;
        self.inner.presence.touch(name);
        let id = self.inner.sessions.open(name);
        info!("{} logged in", name);
        self.announce(Message::joined(name));
        Ok(Session {
            id,
            name: name.to_string(),
        })
    }

    /// Name behind a live session, or `NotAuthenticated`.
    pub fn authenticate(&self, session: Uuid) -> Result<String, ChatError> {
        self.inner
            .sessions
            .resolve(session)
            .ok_or(ChatError::NotAuthenticated)
    }

    /// Leave the chat, ending every session of `name`.
    /// Returns whether the name was present.
    pub fn logout(&self, name: &str) -> bool {
        let name = name.trim();
        self.inner.sessions.revoke_name(name);
        if !self.inner.presence.remove(name) {
            return false;
        }
        info!("{} logged out", name);
        self.announce(Message::left(name));
        true
    }

    pub fn send(&self, name: &str, content: &str) -> Result<(), ChatError> {
        let name = require_name(name, ChatError::EmptyName)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyContent);
        }
        if !self.inner.presence.contains(name) {
            return Err(ChatError::NotActive);
        }

        self.inner.presence.touch(name);
        self.announce(Message::new(name, content));
        Ok(())
    }

    /// Full history on first load, otherwise whatever is pending.
    pub fn poll(&self, name: &str, first_load: bool) -> Result<Poll, ChatError> {
        let name = require_name(name, ChatError::NotAuthenticated)?;
        self.inner.presence.touch(name);

        let messages = if first_load {
            self.inner.broadcaster.snapshot()
        } else {
            self.inner.broadcaster.drain()
        };

        Ok(Poll {
            messages: render(&messages),
            users: self.inner.presence.active_names(),
            cursor: None,
        })
    }

    /// The last `limit` messages of the history.
    pub fn poll_recent(&self, name: &str, limit: usize) -> Result<Poll, ChatError> {
        let name = require_name(name, ChatError::NotAuthenticated)?;
        self.inner.presence.touch(name);

        let messages = self.inner.broadcaster.recent(limit);
        Ok(Poll {
            messages: render(&messages),
            users: self.inner.presence.active_names(),
            cursor: None,
        })
    }

    /// Everything from `cursor` on. Independent of other pollers.
    pub fn poll_since(&self, name: &str, cursor: usize) -> Result<Poll, ChatError> {
        let name = require_name(name, ChatError::NotAuthenticated)?;
        self.inner.presence.touch(name);

        let (messages, next) = self.inner.broadcaster.since(cursor);
        Ok(Poll {
            messages: render(&messages),
            users: self.inner.presence.active_names(),
            cursor: Some(next),
        })
    }

    pub fn list_active_users(&self, name: &str) -> Result<Vec<String>, ChatError> {
        require_name(name, ChatError::NotAuthenticated)?;
        Ok(self.inner.presence.active_names())
    }

    /// Remove everyone idle as of `now` and announce each departure.
    pub fn expire_idle(&self, now: DateTime<Utc>) -> Vec<String> {
        let expired = self
            .inner
            .presence
            .remove_expired(now, self.inner.inactivity);
        for name in &expired {
            self.inner.sessions.revoke_name(name);
            info!("{} timed out", name);
            self.announce(Message::left(name));
        }
        expired
    }

    /// Publish and keep going if the history file can't be written.
    fn announce(&self, message: Message) {
        if let Err(e) = self.inner.broadcaster.publish(message) {
            warn!("Failed to persist chat history: {}", ChatError::from(e));
        }
    }
}

fn require_name(name: &str, err: ChatError) -> Result<&str, ChatError> {
    let name = name.trim();
    if name.is_empty() { Err(err) } else { Ok(name) }
}

fn render(messages: &[Message]) -> Vec<String> {
    messages.iter().map(ToString::to_string).collect()
}
