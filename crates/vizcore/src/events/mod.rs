// crates/vizcore/src/events/mod.rs

mod channel;
mod event;

pub use channel::{EventChannel, EventReceiver, EventStream};
pub use event::ExecutionEvent;
