//! Writer and reader endpoints over a shared [`MessageQueue`].
//!
//! Endpoints are vended by the [`QueueHive`](crate::events::QueueHive); each
//! one aliases the hive's queue, so any number of writers and readers can
//! work one channel concurrently.

use std::sync::Arc;

use crate::events::queue::MessageQueue;

/// Write-only end of a message queue.
#[derive(Debug)]
pub struct EventWriter<T> {
    queue: Arc<MessageQueue<T>>,
}

impl<T> EventWriter<T> {
    pub(crate) fn new(queue: Arc<MessageQueue<T>>) -> Self {
        Self { queue }
    }

    /// Enqueues one message.
    pub fn write(&self, message: T) {
        self.queue.push(message);
    }

    /// Enqueues a batch, preserving its order relative to this writer.
    pub fn write_bulk(&self, messages: impl IntoIterator<Item = T>) {
        for message in messages {
            self.queue.push(message);
        }
    }
}

/// Read-only end of a message queue.
pub struct EventReader<T> {
    queue: Arc<MessageQueue<T>>,
}

impl<T> EventReader<T> {
    pub(crate) fn new(queue: Arc<MessageQueue<T>>) -> Self {
        Self { queue }
    }

    /// Consumes currently queued messages in FIFO order.
    ///
    /// See [`MessageQueue::drain`] for the re-entrancy bound.
    pub fn drain(&self, callback: impl FnMut(&T)) {
        self.queue.drain(callback);
    }
}
