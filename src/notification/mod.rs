//! Task events, their fan-out to live connections, and the emitter boundary
//! used by request handlers once a mutation has committed.

mod broadcaster;
mod emitter;
mod types;

pub use broadcaster::{BroadcastStatsSnapshot, DeliveryResult, EventBroadcaster};
pub use emitter::MutationEmitter;
pub use types::{TaskEvent, TaskId, TaskShare};
