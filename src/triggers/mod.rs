//! Ingress for mutation events raised outside this process.
//!
//! The task API commits a mutation, then posts the resulting event here.

mod http;

pub use http::{emit_event, emit_task_shared, EmitEventRequest, EmitEventResponse};
