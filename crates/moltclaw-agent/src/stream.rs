//! Stream plumbing: the producer-side [`EventSink`] and the consumer-side
//! [`AgentStream`].
//!
//! A run is driven by a spawned task that writes into a bounded channel of
//! capacity 1, so the producer only gets ahead of the consumer by a single
//! event. The runner writes the `start` event itself before handing the
//! sink to the producer, and the sink refuses anything after `final`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use futures::Stream;
use futures::stream::FusedStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, trace, warn};

use moltclaw_core::error::MoltClawError;
use moltclaw_core::types::AgentConfig;

use crate::event::{FinalResult, StreamEvent};
use crate::producer::EventProducer;

/// Why the sink refused an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("stream already finished")]
    Finished,
    #[error("start is emitted by the runner")]
    UnexpectedStart,
    #[error("consumer dropped the stream")]
    Closed,
}

/// Write end of a stream, handed to an [`EventProducer`].
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
    finished: bool,
    emitted: usize,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            tx,
            finished: false,
            emitted: 0,
        }
    }

    /// Send an event, waiting until the consumer has room for it.
    pub async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkError> {
        if self.finished {
            return Err(SinkError::Finished);
        }
        if matches!(event, StreamEvent::Start { .. }) {
            return Err(SinkError::UnexpectedStart);
        }

        let is_final = event.is_final();
        trace!(kind = %event.kind(), "emit");
        self.tx.send(event).await.map_err(|_| SinkError::Closed)?;
        self.emitted += 1;
        if is_final {
            self.finished = true;
        }
        Ok(())
    }

    pub async fn token(&mut self, text: impl Into<String>) -> Result<(), SinkError> {
        self.emit(StreamEvent::token(text)).await
    }

    pub async fn tool(
        &mut self,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Result<(), SinkError> {
        self.emit(StreamEvent::tool(name, arguments)).await
    }

    pub async fn error(&mut self, message: impl Into<String>) -> Result<(), SinkError> {
        self.emit(StreamEvent::error(message)).await
    }

    /// Emit the terminal `final` event. Nothing can be sent afterwards.
    pub async fn finish(&mut self, result: FinalResult) -> Result<(), SinkError> {
        self.emit(StreamEvent::Final(result)).await
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// True once the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Events sent through this sink so far (excluding `start`).
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

/// Lifecycle of a single stream, as observed by its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    NotStarted,
    Started,
    Streaming,
    Finished,
    Aborted,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Aborted)
    }
}

/// Read end of a stream.
///
/// Single-pass: once it has yielded `None` it stays exhausted. The payload
/// of the `final` event is retained and available from
/// [`final_result`](Self::final_result) after it has been yielded.
/// Dropping the stream cancels the producer.
pub struct AgentStream {
    rx: mpsc::Receiver<StreamEvent>,
    task: Option<JoinHandle<()>>,
    state: StreamState,
    final_result: Option<FinalResult>,
}

impl AgentStream {
    pub(crate) fn new(rx: mpsc::Receiver<StreamEvent>, task: Option<JoinHandle<()>>) -> Self {
        Self {
            rx,
            task,
            state: StreamState::NotStarted,
            final_result: None,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// The `final` payload, once it has been yielded.
    pub fn final_result(&self) -> Option<&FinalResult> {
        self.final_result.as_ref()
    }

    /// Wait for the next event. Returns `None` at end of stream.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        futures::StreamExt::next(self).await
    }

    /// Drain the remaining events and return the `final` payload, if any.
    pub async fn finish(mut self) -> Option<FinalResult> {
        while self.next_event().await.is_some() {}
        self.final_result.take()
    }

    /// Stop consuming. The producer is cancelled and the stream ends.
    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            debug!(state = ?self.state, "stream aborted by consumer");
            self.state = StreamState::Aborted;
        }
        self.rx.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn advance(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Start { .. } => {
                if self.state != StreamState::NotStarted {
                    warn!(state = ?self.state, "duplicate start event");
                }
                self.state = StreamState::Started;
            }
            StreamEvent::Final(result) => {
                self.state = StreamState::Finished;
                self.final_result = Some(result.clone());
                self.rx.close();
            }
            StreamEvent::Token { .. } | StreamEvent::Tool { .. } | StreamEvent::Error { .. } => {
                self.state = StreamState::Streaming;
            }
        }
    }
}

impl Stream for AgentStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        if self.state.is_terminal() {
            return Poll::Ready(None);
        }

        match ready!(self.rx.poll_recv(cx)) {
            Some(event) => {
                self.advance(&event);
                Poll::Ready(Some(event))
            }
            None => {
                debug!(state = ?self.state, "stream ended without a final event");
                self.state = StreamState::Aborted;
                Poll::Ready(None)
            }
        }
    }
}

impl FusedStream for AgentStream {
    fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }
}

impl Drop for AgentStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Start a producer task for one run and return the consumer handle.
///
/// Fails when called outside a tokio runtime.
pub(crate) fn spawn_stream(
    producer: Arc<dyn EventProducer>,
    prompt: String,
    config: AgentConfig,
) -> moltclaw_core::error::Result<AgentStream> {
    let handle = Handle::try_current()
        .map_err(|e| MoltClawError::Agent(format!("stream needs a tokio runtime: {e}")))?;
    let (tx, rx) = mpsc::channel(1);
    let span = info_span!("agent_stream", model = %config.model);
    let task = handle.spawn(drive(producer, prompt, config, tx).instrument(span));
    Ok(AgentStream::new(rx, Some(task)))
}

async fn drive(
    producer: Arc<dyn EventProducer>,
    prompt: String,
    config: AgentConfig,
    tx: mpsc::Sender<StreamEvent>,
) {
    let start = StreamEvent::Start {
        config: config.clone(),
    };
    if tx.send(start).await.is_err() {
        debug!("consumer dropped before start");
        return;
    }

    let mut sink = EventSink::new(tx);
    match producer.produce(&prompt, &config, &mut sink).await {
        Ok(()) if sink.is_finished() => {
            debug!(events = sink.emitted(), "producer finished");
        }
        Ok(()) => {
            debug!(events = sink.emitted(), "producer stopped without a final event");
        }
        Err(e) if e.downcast_ref::<SinkError>() == Some(&SinkError::Closed) => {
            debug!("consumer dropped the stream");
        }
        Err(e) if sink.is_finished() => {
            debug!(error = %e, "producer kept going after final");
        }
        Err(e) => {
            warn!(error = %e, "producer failed");
            if let Err(sink_err) = sink.error(e.to_string()).await {
                debug!(error = %sink_err, "could not report producer failure");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Usage;

    fn channel_stream() -> (EventSink, AgentStream, mpsc::Sender<StreamEvent>) {
        let (tx, rx) = mpsc::channel(8);
        let sink = EventSink::new(tx.clone());
        (sink, AgentStream::new(rx, None), tx)
    }

    #[tokio::test]
    async fn test_sink_rejects_events_after_final() {
        let (mut sink, _stream, _tx) = channel_stream();
        sink.finish(FinalResult::new("a", Usage::default()))
            .await
            .unwrap();
        assert!(sink.is_finished());
        assert_eq!(sink.token("late").await, Err(SinkError::Finished));
        assert_eq!(
            sink.finish(FinalResult::new("b", Usage::default())).await,
            Err(SinkError::Finished)
        );
        assert_eq!(sink.emitted(), 1);
    }

    #[tokio::test]
    async fn test_sink_rejects_start() {
        let (mut sink, _stream, _tx) = channel_stream();
        let err = sink
            .emit(StreamEvent::Start {
                config: AgentConfig::default(),
            })
            .await;
        assert_eq!(err, Err(SinkError::UnexpectedStart));
    }

    #[tokio::test]
    async fn test_sink_reports_closed_consumer() {
        let (mut sink, stream, tx) = channel_stream();
        drop(stream);
        drop(tx);
        assert!(sink.is_closed());
        assert_eq!(sink.token("nobody listening").await, Err(SinkError::Closed));
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let (mut sink, mut stream, tx) = channel_stream();
        assert_eq!(stream.state(), StreamState::NotStarted);

        tx.send(StreamEvent::Start {
            config: AgentConfig::default(),
        })
        .await
        .unwrap();
        sink.token("hi").await.unwrap();
        sink.finish(FinalResult::new("done", Usage::default()))
            .await
            .unwrap();

        stream.next_event().await.unwrap();
        assert_eq!(stream.state(), StreamState::Started);
        stream.next_event().await.unwrap();
        assert_eq!(stream.state(), StreamState::Streaming);
        assert!(stream.final_result().is_none());
        stream.next_event().await.unwrap();
        assert_eq!(stream.state(), StreamState::Finished);
        assert_eq!(stream.final_result().unwrap().answer, "done");
        assert!(stream.next_event().await.is_none());
        assert!(stream.is_terminated());
    }

    #[tokio::test]
    async fn test_closed_without_final_is_aborted() {
        let (tx, rx) = mpsc::channel(2);
        let mut stream = AgentStream::new(rx, None);
        tx.send(StreamEvent::Start {
            config: AgentConfig::default(),
        })
        .await
        .unwrap();
        drop(tx);

        assert!(stream.next_event().await.is_some());
        assert!(stream.next_event().await.is_none());
        assert_eq!(stream.state(), StreamState::Aborted);
        assert!(stream.finish().await.is_none());
    }

    #[test]
    fn test_spawn_outside_runtime_is_an_error() {
        let producer: Arc<dyn EventProducer> =
            Arc::new(crate::producer::PlaceholderProducer::default());
        let result = spawn_stream(producer, "hi".into(), AgentConfig::default());
        assert!(matches!(result, Err(MoltClawError::Agent(msg)) if msg.contains("runtime")));
    }

    #[tokio::test]
    async fn test_emit_after_final_keeps_stream_finished() {
        let script = vec![
            StreamEvent::Final(FinalResult::new("done", Usage::default())),
            StreamEvent::token("late"),
        ];
        let producer: Arc<dyn EventProducer> =
            Arc::new(crate::producer::ScriptedProducer::new(script));
        let mut stream = spawn_stream(producer, "hi".into(), AgentConfig::default()).unwrap();

        let mut events = Vec::new();
        while let Some(event) = stream.next_event().await {
            events.push(event);
        }
        assert_eq!(stream.state(), StreamState::Finished);
        assert_eq!(events.len(), 2);
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_abort_stops_delivery() {
        let (mut sink, mut stream, _tx) = channel_stream();
        sink.token("queued").await.unwrap();
        stream.abort();
        assert_eq!(stream.state(), StreamState::Aborted);
        assert!(stream.next_event().await.is_none());
    }
}
