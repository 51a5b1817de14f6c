mod channel;
mod event_types;
mod hooks;
mod result_sink;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
pub use result_sink::{result_stream, ResultSink};
