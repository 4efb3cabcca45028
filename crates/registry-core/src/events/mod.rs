//! Event system for tracked entity mutations
//!
//! This module provides:
//! - Ledger event types (create, update, delete)
//! - Mutation hooks that record events inside the writing transaction
//! - The relay handing events from writers to the dispatcher
//! - Webhook dispatch to registered subscriptions

mod dispatcher;
mod event;
mod hooks;
mod relay;

pub use dispatcher::{Notification, SubscriptionSource, WebhookDispatcher, USER_AGENT};
pub use event::{Event, EventType};
pub use hooks::{MutationHook, TrackedEntity};
pub use relay::{EventRelay, RelayReceiver};
