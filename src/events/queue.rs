//! Typed multi-producer multi-consumer message queue.

use std::sync::Arc;

use crossbeam_queue::SegQueue;

use crate::log::LogSink;

/// Unbounded FIFO of `T` values shared by writer and reader endpoints.
///
/// Writes from a single producer keep their order; ordering across
/// producers is not defined. The numeric id only appears in diagnostics.
pub struct MessageQueue<T> {
    messages: SegQueue<T>,
    log: Arc<dyn LogSink>,
    id: u64,
}

impl<T> std::fmt::Debug for MessageQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueue")
            .field("id", &self.id)
            .finish()
    }
}

impl<T> MessageQueue<T> {
    pub(crate) fn new(log: Arc<dyn LogSink>, id: u64) -> Self {
        Self {
            messages: SegQueue::new(),
            log,
            id,
        }
    }

    /// The channel id this queue was created under.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of queued messages. Approximate while producers are active.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Enqueues one message.
    pub fn push(&self, message: T) {
        self.messages.push(message);
    }

    /// Delivers queued messages to `callback` in FIFO order, removing each
    /// before the next is delivered.
    ///
    /// The drain is bounded by the queue length observed at entry: messages
    /// enqueued while draining, including by the callback itself, surface on
    /// a later drain rather than extending this one.
    pub fn drain(&self, mut callback: impl FnMut(&T)) {
        let mut budget = self.messages.len();
        while budget > 0 {
            match self.messages.pop() {
                Some(message) => callback(&message),
                None => break,
            }
            budget -= 1;
        }
    }
}

impl<T> Drop for MessageQueue<T> {
    fn drop(&mut self) {
        let residual = self.messages.len();
        if residual > 0 {
            self.log.warn(&format!(
                "message queue {} dropped with approximately {residual} unprocessed message(s)",
                self.id
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{LogLevel, MemorySink};

    fn queue<T>(id: u64) -> (Arc<MemorySink>, MessageQueue<T>) {
        let sink = Arc::new(MemorySink::new());
        let mq = MessageQueue::new(sink.clone(), id);
        (sink, mq)
    }

    #[test]
    fn drains_in_fifo_order() {
        let (_, mq) = queue::<u32>(1);
        mq.push(1);
        mq.push(2);
        mq.push(3);

        let mut seen = Vec::new();
        mq.drain(|n| seen.push(*n));
        assert_eq!(seen, [1, 2, 3]);
        assert!(mq.is_empty());
    }

    #[test]
    fn draining_an_empty_queue_is_a_no_op() {
        let (_, mq) = queue::<u32>(2);
        mq.drain(|_| panic!("no messages should be delivered"));
    }

    #[test]
    fn reentrant_pushes_surface_on_the_next_drain() {
        let (_, mq) = queue::<u32>(3);
        mq.push(1);
        mq.push(2);

        let mut first_pass = Vec::new();
        mq.drain(|n| {
            first_pass.push(*n);
            mq.push(n + 10);
        });
        assert_eq!(first_pass, [1, 2]);

        let mut second_pass = Vec::new();
        mq.drain(|n| second_pass.push(*n));
        assert_eq!(second_pass, [11, 12]);
    }

    #[test]
    fn dropping_a_nonempty_queue_warns_with_the_id() {
        let (sink, mq) = queue::<u32>(9);
        mq.push(7);
        drop(mq);

        assert!(sink.contains(LogLevel::Warn, "message queue 9"));
        assert!(sink.contains(LogLevel::Warn, "1 unprocessed"));
    }

    #[test]
    fn dropping_a_drained_queue_stays_silent() {
        let (sink, mq) = queue::<u32>(10);
        mq.push(7);
        mq.drain(|_| {});
        drop(mq);
        assert!(sink.entries().is_empty());
    }
}
