//! Event relay using a bounded tokio mpsc channel
//!
//! Hands events from the write path to the single webhook dispatcher.
//! Offering never waits: when the channel is full or the dispatcher is gone,
//! the event is dropped and the drop is logged. The ledger row is unaffected,
//! only the live notification is lost.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::events::Event;

/// Producer side of the relay, cloned into every writer.
#[derive(Clone)]
pub struct EventRelay {
    sender: mpsc::Sender<Event>,
    dropped: Arc<AtomicU64>,
}

/// Consumer side of the relay. There is exactly one per relay.
pub struct RelayReceiver {
    receiver: mpsc::Receiver<Event>,
}

impl EventRelay {
    /// Create a relay holding at most `capacity` undelivered events.
    ///
    /// The capacity is fixed for the lifetime of the relay; zero is raised
    /// to one since the channel cannot be unbuffered.
    pub fn channel(capacity: usize) -> (EventRelay, RelayReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            EventRelay {
                sender,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            RelayReceiver { receiver },
        )
    }

    /// Offer an event to the dispatcher without waiting.
    ///
    /// Returns `true` when the event was handed off, `false` when it was
    /// dropped because the relay is full or the dispatcher has stopped.
    pub fn offer(&self, event: Event) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    entity_type = %event.entity_type,
                    entity_id = %event.entity_id,
                    "Event relay full, dropping webhook notification"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    entity_type = %event.entity_type,
                    entity_id = %event.entity_id,
                    "No webhook dispatcher running, dropping webhook notification"
                );
                false
            }
        }
    }

    /// Number of events dropped since the relay was created.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Fixed number of events the relay can buffer.
    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

impl RelayReceiver {
    /// Receive the next event.
    ///
    /// Returns None once every producer has been dropped.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }
}
