mod binder;
mod handler;
mod message;

pub use binder::{BindOutcome, IdentityBinder};
pub use handler::ws_handler;
pub use message::{ClientMessage, OutboundMessage};
