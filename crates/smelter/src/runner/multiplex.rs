//! Output stream multiplexing for interactive sessions
//!
//! Reader tasks block on child output and push events here; the
//! UI-owning consumer drains on its own schedule. Multi-producer,
//! single-consumer: producers only enqueue, exactly one side dequeues,
//! so no consumer-side locking is needed.
//!
//! Ordering: within one stream, line order is preserved (one producer
//! per stream). Across stdout and stderr the relative order is
//! best-effort — each stream has its own reader.

use tokio::sync::mpsc;

/// One event from an interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A line of standard output
    Stdout(String),

    /// A line of standard error
    Stderr(String),

    /// The session's child was sent an interrupt signal
    Interrupted,

    /// Terminal marker: the process exited and all buffered output has
    /// been flushed ahead of this event
    Exited { return_code: Option<i32> },
}

/// Producer half: cloned into each reader task.
#[derive(Debug, Clone)]
pub(crate) struct OutputQueue {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl OutputQueue {
    /// Enqueue an event. Silently drops the event if the consumer is
    /// gone — producers must not fail because the session was discarded.
    pub(crate) fn push(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

/// Consumer half: owned by the session, drained by the UI tick.
#[derive(Debug)]
pub(crate) struct OutputDrain {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl OutputDrain {
    /// Pop one queued event without blocking.
    pub(crate) fn try_next(&mut self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain everything currently queued without blocking.
    pub(crate) fn drain(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait for the next event. Returns `None` once all producers are
    /// gone and the queue is empty.
    pub(crate) async fn next(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }
}

/// Create a connected producer/consumer pair.
pub(crate) fn channel() -> (OutputQueue, OutputDrain) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OutputQueue { tx }, OutputDrain { rx })
}
