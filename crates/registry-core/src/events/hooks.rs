//! Mutation hooks: event capture for tracked entities.
//!
//! Every create, update or delete of a tracked entity runs the hook inside
//! the transaction that performed the write. The hook appends one event to
//! the ledger with the same transaction, so the event commits or rolls back
//! together with the write, then offers the event to the relay.
//!
//! The relay offer happens before the enclosing transaction has committed.
//! A dispatch can therefore race the commit: a subscriber may be notified
//! slightly before the event row is visible to other readers, or for a
//! write that a later statement of the same transaction rolls back.

use rusqlite::Transaction;

use crate::error::RegistryResult;
use crate::events::{Event, EventRelay, EventType};
use crate::store::ledger;

/// An entity whose mutations are recorded in the event ledger.
pub trait TrackedEntity {
    /// Resource kind, used as the event's entity type and the table name.
    const ENTITY_TYPE: &'static str;

    /// Identifier of this instance.
    fn entity_id(&self) -> &str;

    /// Resource kind of this instance.
    fn entity_type(&self) -> &str {
        Self::ENTITY_TYPE
    }
}

/// Records ledger events and forwards them to the relay.
#[derive(Clone)]
pub struct MutationHook {
    relay: EventRelay,
}

impl MutationHook {
    pub fn new(relay: EventRelay) -> Self {
        Self { relay }
    }

    /// Record that `entity` was mutated.
    ///
    /// A failed insert is returned to the caller, which must abort the
    /// transaction so the mutation itself is rolled back.
    pub fn after_mutation<E: TrackedEntity>(
        &self,
        tx: &Transaction<'_>,
        event_type: EventType,
        entity: &E,
    ) -> RegistryResult<Event> {
        let event = Event::new(event_type, entity.entity_type(), entity.entity_id());
        ledger::insert_event(tx, &event)?;

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            "Recorded event"
        );

        self.relay.offer(event.clone());
        Ok(event)
    }

    /// The relay this hook offers events to.
    pub fn relay(&self) -> &EventRelay {
        &self.relay
    }
}
