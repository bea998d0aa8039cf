//! Garden domain events and the in-process plumbing that carries them.
//!
//! - [`GardenEvent`]: the closed set of events commands emit
//! - [`EventBus`]: non-blocking fan-out to subscribers, with a separate
//!   level-filtered subscription for log entries
//! - [`CleanupHooks`]: handlers run when the process is interrupted

pub mod bus;
pub mod error;
pub mod event;
pub mod hooks;

pub use bus::{EventBus, SubscriptionFilter, SubscriptionId};
pub use error::EventBusError;
pub use event::{
    ActionState, ActionStatusPayload, CommandInfoPayload, ConfigChangedPayload, EmptyPayload,
    EventContext, EventName, GardenEvent, LogEntryPayload, LogLevel, SessionStatusPayload,
};
pub use hooks::{CleanupHooks, HookId};
