//! # QueueHive: typed message queues multiplexed by channel id.
//!
//! The hive lazily creates one [`MessageQueue`] per 64-bit channel id and
//! vends [`EventWriter`]/[`EventReader`] endpoints aliasing it. The first
//! request for an id binds the channel's message type; later requests with a
//! different type fail with [`HiveError::TypeMismatch`]: reusing a channel
//! id across types is a bug in the embedding program, not a situation to
//! paper over.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{HiveError, InjectError};
use crate::events::endpoints::{EventReader, EventWriter};
use crate::events::queue::MessageQueue;
use crate::injector::{FromInjector, Injector};
use crate::log::LogSink;
use crate::sync_cell::SyncCell;
use crate::type_key::TypeKey;
use crate::type_map::InstanceId;

struct Channel {
    key: TypeKey,
    // Holds an Arc<MessageQueue<T>> for the bound T.
    queue: Box<dyn Any + Send + Sync>,
}

/// Lazily-populated map from channel id to a type-tagged message queue.
pub struct QueueHive {
    log: Arc<dyn LogSink>,
    channels: SyncCell<HashMap<u64, Channel>>,
}

impl QueueHive {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self {
            log,
            channels: SyncCell::new(HashMap::new()),
        }
    }

    /// A writer endpoint for channel `id`, creating the queue on first use.
    pub fn get_writer<T: Send + Sync + 'static>(
        &self,
        id: u64,
    ) -> Result<EventWriter<T>, HiveError> {
        Ok(EventWriter::new(self.queue_for::<T>(id)?))
    }

    /// A reader endpoint for channel `id`, creating the queue on first use.
    pub fn get_reader<T: Send + Sync + 'static>(
        &self,
        id: u64,
    ) -> Result<EventReader<T>, HiveError> {
        Ok(EventReader::new(self.queue_for::<T>(id)?))
    }

    fn queue_for<T: Send + Sync + 'static>(
        &self,
        id: u64,
    ) -> Result<Arc<MessageQueue<T>>, HiveError> {
        let key = TypeKey::of::<T>();
        let mut channels = self.channels.lock();

        let channel = channels.entry(id).or_insert_with(|| Channel {
            key,
            queue: Box::new(Arc::new(MessageQueue::<T>::new(Arc::clone(&self.log), id))),
        });

        channel
            .queue
            .downcast_ref::<Arc<MessageQueue<T>>>()
            .map(Arc::clone)
            .ok_or(HiveError::TypeMismatch {
                id,
                stored: channel.key.name(),
                requested: key.name(),
            })
    }
}

impl FromInjector for QueueHive {
    fn from_injector(injector: &Injector, _id: InstanceId) -> Result<Self, InjectError> {
        Ok(Self::new(injector.get_impl::<dyn LogSink>()?))
    }
}
