//! Serialized output.
//!
//! Workers never write to stdout or stderr themselves. They send [`Event`]s
//! through a [`ReportSink`] to a single writer task, so lines from concurrent
//! workers are never interleaved.

use log::debug;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{ErrorKind, ItemError, RequestOutcome, Result};

/// Default capacity of the channel between workers and the writer task
pub const DEFAULT_BUFFER: usize = 1024;

/// Marker in front of per-item failures
const FAILURE_MARKER: &str = "❌";
/// Marker in front of notices
const NOTICE_MARKER: &str = "🌩 ";

/// Something to be written by the reporter
#[derive(Debug)]
pub enum Event {
    /// A request passed all filters; written to the report stream
    Reported(RequestOutcome),
    /// A work item failed; written to the diagnostic stream
    Failed(ItemError),
    /// Informational message, e.g. about a burst cooldown; written to the
    /// diagnostic stream
    Notice(String),
}

/// Handle for sending events to the reporter. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReportSink {
    sender: mpsc::Sender<Event>,
}

impl ReportSink {
    /// Queue `event` for writing.
    ///
    /// Waits if the writer is lagging behind. If the writer has already
    /// stopped (e.g. because stdout was closed) the event is dropped.
    pub async fn send(&self, event: Event) {
        if self.sender.send(event).await.is_err() {
            debug!("Reporter stopped, dropping event");
        }
    }

    /// Report a request which passed all filters
    pub async fn reported(&self, outcome: RequestOutcome) {
        self.send(Event::Reported(outcome)).await;
    }

    /// Report a failed work item
    pub async fn failed(&self, error: ItemError) {
        self.send(Event::Failed(error)).await;
    }

    /// Emit an informational notice
    pub async fn notice(&self, text: impl Into<String>) {
        self.send(Event::Notice(text.into())).await;
    }

    /// Returns `true` once the writer task has stopped
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Spawn the writer task.
///
/// Report lines go to `out`, diagnostics and notices to `err`. The task
/// finishes once every [`ReportSink`] has been dropped and hands both
/// writers back, or stops at the first write error.
pub fn spawn<O, E>(out: O, err: E, buffer: usize) -> (ReportSink, JoinHandle<Result<(O, E)>>)
where
    O: AsyncWrite + Unpin + Send + 'static,
    E: AsyncWrite + Unpin + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(buffer.max(1));
    let handle = tokio::spawn(write_events(receiver, out, err));
    (ReportSink { sender }, handle)
}

async fn write_events<O, E>(mut receiver: mpsc::Receiver<Event>, mut out: O, mut err: E) -> Result<(O, E)>
where
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    while let Some(event) = receiver.recv().await {
        match event {
            Event::Reported(outcome) => write_line(&mut out, &outcome.to_string()).await?,
            Event::Failed(error) => {
                write_line(&mut err, &format!("{FAILURE_MARKER} {error}")).await?;
            }
            Event::Notice(text) => write_line(&mut err, &format!("{NOTICE_MARKER} {text}")).await?,
        }

        // Flush once the queue runs dry
        if receiver.is_empty() {
            out.flush().await.map_err(ErrorKind::WriteOutput)?;
            err.flush().await.map_err(ErrorKind::WriteOutput)?;
        }
    }

    out.flush().await.map_err(ErrorKind::WriteOutput)?;
    err.flush().await.map_err(ErrorKind::WriteOutput)?;
    Ok((out, err))
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<()> {
    writer
        .write_all(format!("{line}\n").as_bytes())
        .await
        .map_err(ErrorKind::WriteOutput)
}
