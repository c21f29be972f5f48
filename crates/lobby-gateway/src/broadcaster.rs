use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use lobby_store::{MessageLog, PersistError};
use lobby_types::models::Message;

/// Undrained messages kept for pollers before the oldest are dropped.
pub const DEFAULT_PENDING_LIMIT: usize = 1000;

/// Fans messages out to pollers through one shared pending buffer.
///
/// Every `drain` empties the buffer for everyone: two pollers racing each
/// other split the pending messages between them. Pollers that need every
/// message should read with `since` instead, which keeps its position in
/// the caller's hands and leaves shared state alone.
///
/// The buffer holds at most `limit` messages. When nobody drains, the
/// oldest ones are dropped; they are still in the log.
pub struct Broadcaster {
    log: MessageLog,
    /// Lock order: `pending`, then the log's own lock.
    pending: Mutex<Pending>,
    limit: usize,
}

#[derive(Default)]
struct Pending {
    queue: VecDeque<Message>,
    /// Dropped since the last drain.
    dropped: usize,
}

impl Broadcaster {
    pub fn new(log: MessageLog) -> Self {
        Self::with_limit(log, DEFAULT_PENDING_LIMIT)
    }

    pub fn with_limit(log: MessageLog, limit: usize) -> Self {
        Self {
            log,
            pending: Mutex::new(Pending::default()),
            limit: limit.max(1),
        }
    }

    /// Append to the log, then queue for pollers.
    ///
    /// The message is queued even when persisting fails; the error is
    /// returned so the caller can report it.
    pub fn publish(&self, message: Message) -> Result<(), PersistError> {
        let mut pending = self.pending();
        let persisted = self.log.append(message.clone());

        if pending.queue.len() >= self.limit {
            if pending.dropped == 0 {
                warn!(
                    "Pending buffer full ({} messages, nobody draining), dropping oldest",
                    self.limit
                );
            }
            pending.queue.pop_front();
            pending.dropped += 1;
        }
        pending.queue.push_back(message);
        persisted
    }

    /// Take everything published since the previous drain.
    pub fn drain(&self) -> Vec<Message> {
        let mut pending = self.pending();
        if pending.dropped > 0 {
            debug!("{} pending messages were dropped before this drain", pending.dropped);
            pending.dropped = 0;
        }
        std::mem::take(&mut pending.queue).into()
    }

    /// Full history, for a poller's first contact.
    pub fn snapshot(&self) -> Vec<Message> {
        self.log.all()
    }

    /// The last `count` messages of the history.
    pub fn recent(&self, count: usize) -> Vec<Message> {
        self.log.recent(count)
    }

    /// History from position `cursor` on, plus the next cursor.
    pub fn since(&self, cursor: usize) -> (Vec<Message>, usize) {
        self.log.since(cursor)
    }

    pub fn pending_len(&self) -> usize {
        self.pending().queue.len()
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    fn pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
