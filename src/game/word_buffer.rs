//! Single-slot rendezvous between the network listener and a room's game
//! loop.

use std::sync::Mutex;

use tokio::sync::Notify;

/// A one-value mailbox with last-writer-wins semantics.
///
/// `put` never blocks and overwrites any un-consumed prior value; only the
/// latest input matters for the current turn. `get` parks until a value is
/// present and is safe to race against a turn deadline: a cancelled `get`
/// leaves a pending value in the slot for the next call.
#[derive(Debug, Default)]
pub struct WordInputBuffer {
    slot: Mutex<Option<String>>,
    notify: Notify,
}

impl WordInputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a submission, replacing any previous un-consumed one, and wake
    /// the consumer.
    pub fn put(&self, word: String) {
        *self.lock() = Some(word);
        self.notify.notify_one();
    }

    /// Take the pending submission, blocking until one arrives.
    ///
    /// Only one consumer at a time (the room's game loop).
    pub async fn get(&self) -> String {
        loop {
            let notified = self.notify.notified();
            if let Some(word) = self.lock().take() {
                return word;
            }
            notified.await;
        }
    }

    /// Drop any stale submission left over from a previous turn.
    pub fn clear(&self) {
        self.lock().take();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_put_then_get_returns_value() {
        let buffer = WordInputBuffer::new();
        buffer.put("apple".into());
        assert_eq!(buffer.get().await, "apple");
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let buffer = WordInputBuffer::new();
        buffer.put("apple".into());
        buffer.put("elephant".into());
        assert_eq!(buffer.get().await, "elephant");
    }

    #[tokio::test]
    async fn test_get_blocks_until_put() {
        let buffer = Arc::new(WordInputBuffer::new());
        let reader = {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move { buffer.get().await })
        };

        // Give the reader a chance to park before the value arrives.
        tokio::task::yield_now().await;
        buffer.put("tiger".into());

        let word = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .expect("reader should complete")
            .expect("reader should not panic");
        assert_eq!(word, "tiger");
    }

    #[tokio::test]
    async fn test_cancelled_get_leaves_value_for_next_consumer() {
        let buffer = Arc::new(WordInputBuffer::new());

        // A deadline-bounded get that loses the race.
        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), buffer.get()).await;
        assert!(timed_out.is_err());

        buffer.put("rabbit".into());
        assert_eq!(buffer.get().await, "rabbit");
    }

    #[tokio::test]
    async fn test_clear_discards_stale_input() {
        let buffer = WordInputBuffer::new();
        buffer.put("stale".into());
        buffer.clear();
        buffer.put("fresh".into());
        assert_eq!(buffer.get().await, "fresh");
    }
}
