//! Async streams of registry change notifications.
//!
//! Every subscriber gets its own bounded channel. Publishing never blocks the
//! registry: events are offered with `try_send`, a full channel drops the event
//! for that subscriber only, and subscribers whose stream was dropped are
//! forgotten on the next publish.

use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

/// Type alias for a boxed async stream of events.
pub type EventStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// A change to a registry's roster or lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// The registry finished initialising
    Initialised,
    /// A transformer was added to the roster
    Registered {
        /// Transformer name
        name: String,
        /// Whether it takes part in resolution
        converter: bool,
    },
    /// A transformer was removed from the roster
    Unregistered {
        /// Transformer name
        name: String,
    },
    /// The registry was disposed; no further events follow
    Disposed,
}

/// A sender for events in an async stream.
#[derive(Debug)]
pub struct EventSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> EventSender<T> {
    /// Create a new event sender from an mpsc sender.
    pub fn new(tx: mpsc::Sender<T>) -> Self {
        Self { tx }
    }

    /// Send an event, waiting for room in the channel.
    ///
    /// Returns `Err(event)` if the receiver was dropped.
    pub async fn send(&self, event: T) -> Result<(), T> {
        self.tx.send(event).await.map_err(|e| e.0)
    }

    /// Try to send an event without waiting.
    ///
    /// Returns `Err(event)` if the channel is full or closed.
    pub fn try_send(&self, event: T) -> Result<(), T> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(v) => v,
            mpsc::error::TrySendError::Closed(v) => v,
        })
    }

    /// Check if the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Builder for creating event streams.
///
/// # Example
///
/// ```rust
/// use transform_registry::stream::{RegistryEvent, StreamBuilder};
///
/// # async fn example() {
/// let (sender, stream) = StreamBuilder::<RegistryEvent>::new()
///     .buffer_size(16)
///     .build();
///
/// sender.send(RegistryEvent::Initialised).await.unwrap();
/// # drop(stream);
/// # }
/// ```
pub struct StreamBuilder<T> {
    buffer_size: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Send + 'static> StreamBuilder<T> {
    /// Create a new stream builder with default settings.
    pub fn new() -> Self {
        Self {
            buffer_size: 100,
            _marker: std::marker::PhantomData,
        }
    }

    /// Set the buffer size for the underlying channel.
    ///
    /// Default is 100. Must be greater than zero.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Build the stream and sender.
    pub fn build(self) -> (EventSender<T>, EventStream<T>) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let sender = EventSender::new(tx);
        let stream: EventStream<T> = Box::pin(ReceiverStream::new(rx));
        (sender, stream)
    }
}

impl<T: Send + 'static> Default for StreamBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fans registry events out to every live subscriber.
#[derive(Debug)]
pub(crate) struct EventBroadcaster {
    buffer_size: usize,
    subscribers: Mutex<Subscribers>,
}

#[derive(Debug, Default)]
struct Subscribers {
    senders: Vec<EventSender<RegistryEvent>>,
    closed: bool,
}

impl EventBroadcaster {
    pub(crate) fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            subscribers: Mutex::new(Subscribers::default()),
        }
    }

    /// Once closed, new subscribers get a stream that has already ended.
    pub(crate) fn subscribe(&self) -> EventStream<RegistryEvent> {
        let (sender, stream) = StreamBuilder::new().buffer_size(self.buffer_size).build();
        let mut subscribers = self.lock();
        if !subscribers.closed {
            subscribers.senders.push(sender);
        }
        stream
    }

    pub(crate) fn publish(&self, event: RegistryEvent) {
        self.lock()
            .senders
            .retain(|subscriber| match subscriber.try_send(event.clone()) {
                Ok(()) => true,
                Err(_) if subscriber.is_closed() => false,
                Err(dropped) => {
                    warn!(event = ?dropped, "Subscriber lagging, registry event dropped");
                    true
                }
            });
    }

    /// Drops every sender, ending all subscriber streams for good.
    pub(crate) fn close(&self) {
        let mut subscribers = self.lock();
        subscribers.closed = true;
        subscribers.senders.clear();
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.lock().senders.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
