//! Agent streaming protocol.
//!
//! A run produces an ordered, lazily generated sequence of [`StreamEvent`]s:
//! exactly one `start`, any number of `token`/`tool`/`error` events, and at
//! most one terminal `final`. [`Agent::stream`] hands the sequence to the
//! caller as an [`AgentStream`]; [`Agent::run`] collapses it into the
//! `final` payload.

pub mod agent;
pub mod event;
pub mod observer;
pub mod producer;
pub mod stream;

pub use agent::{Agent, run, stream};
pub use event::{EventKind, FinalResult, StreamEvent, Usage};
pub use observer::ToolCallLogger;
pub use producer::{EventProducer, PlaceholderProducer, ScriptedProducer};
pub use stream::{AgentStream, EventSink, SinkError, StreamState};
