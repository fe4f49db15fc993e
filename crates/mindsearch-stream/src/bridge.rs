use std::any::Any;
use std::fmt::Display;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Why the producer side of a bridge stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The iterator ran out of items.
    Exhausted,
    /// The iterator yielded an error.
    Failed(String),
    /// The producer panicked.
    Panicked(String),
    /// The consumer closed the bridge before the producer finished.
    Cancelled,
}

impl Termination {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Panicked(_))
    }

    /// Human-readable detail for error reporting.
    pub fn detail(&self) -> String {
        match self {
            Self::Exhausted => "agent stream ended without a finished status".into(),
            Self::Failed(detail) => detail.clone(),
            Self::Panicked(detail) => format!("agent panicked: {detail}"),
            Self::Cancelled => "agent stream was cancelled".into(),
        }
    }
}

enum Envelope<T> {
    Item(T),
    End(Termination),
}

/// Runs a blocking iterator on a worker thread and hands its items to async
/// code in order.
///
/// Items travel over an unbounded queue followed by exactly one end marker.
/// Producer errors and panics are logged on the worker and surface only as
/// the [`Termination`] recorded once the sequence ends.
///
/// Must be started from within a tokio runtime.
pub struct SyncBridge<T> {
    rx: mpsc::UnboundedReceiver<Envelope<T>>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    termination: Option<Termination>,
    close_timeout: Duration,
    closed: bool,
    released: bool,
}

impl<T: Send + 'static> SyncBridge<T> {
    /// Spawn `producer` on a blocking worker and return immediately.
    pub fn start<F, I, E>(producer: F) -> Self
    where
        F: FnOnce() -> I + Send + 'static,
        I: IntoIterator<Item = std::result::Result<T, E>>,
        E: Display,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = cancel.clone();
        let span = tracing::Span::current();

        let worker = tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            run_producer(producer, tx, worker_cancel);
        });

        Self {
            rx,
            cancel,
            worker: Some(worker),
            termination: None,
            close_timeout: Duration::from_secs(5),
            closed: false,
            released: false,
        }
    }
}

impl<T> SyncBridge<T> {
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Next produced item, or `None` once the end marker arrives.
    pub async fn next(&mut self) -> Option<T> {
        std::future::poll_fn(|cx| self.poll_item(cx)).await
    }

    /// How the producer stopped. `None` while the sequence is still open.
    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True if `close` saw the worker finish.
    pub fn worker_released(&self) -> bool {
        self.released
    }

    /// Stop the producer, drop anything still queued, and wait for the
    /// worker to finish.
    ///
    /// Safe to call more than once; returns `true` only for the call that
    /// did the work. A worker that does not finish within the close timeout
    /// is detached; it stops at its next send because the queue is closed.
    pub async fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.cancel.store(true, Ordering::Release);
        self.rx.close();

        let mut dropped = 0usize;
        while let Ok(envelope) = self.rx.try_recv() {
            match envelope {
                Envelope::Item(_) => dropped += 1,
                Envelope::End(termination) => {
                    self.termination.get_or_insert(termination);
                }
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "discarded unconsumed agent steps");
        }

        if let Some(worker) = self.worker.take() {
            match tokio::time::timeout(self.close_timeout, worker).await {
                Ok(Ok(())) => self.released = true,
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "agent worker did not complete");
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = self.close_timeout.as_millis() as u64,
                        "agent worker still busy after close, detaching"
                    );
                }
            }
        }

        self.termination.get_or_insert(Termination::Cancelled);
        true
    }

    fn poll_item(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.closed || self.termination.is_some() {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Envelope::Item(item))) => Poll::Ready(Some(item)),
            Poll::Ready(Some(Envelope::End(termination))) => {
                self.termination = Some(termination);
                Poll::Ready(None)
            }
            // Worker vanished without an end marker.
            Poll::Ready(None) => {
                self.termination = Some(Termination::Cancelled);
                Poll::Ready(None)
            }
        }
    }
}

impl<T> Unpin for SyncBridge<T> {}

impl<T> Stream for SyncBridge<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().poll_item(cx)
    }
}

impl<T> Drop for SyncBridge<T> {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Release);
        self.rx.close();
    }
}

fn run_producer<T, F, I, E>(producer: F, tx: mpsc::UnboundedSender<Envelope<T>>, cancel: Arc<AtomicBool>)
where
    F: FnOnce() -> I,
    I: IntoIterator<Item = std::result::Result<T, E>>,
    E: Display,
{
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        for item in producer() {
            if cancel.load(Ordering::Acquire) {
                return Termination::Cancelled;
            }
            match item {
                Ok(value) => {
                    if tx.send(Envelope::Item(value)).is_err() {
                        return Termination::Cancelled;
                    }
                }
                Err(err) => {
                    let detail = err.to_string();
                    tracing::error!(error = %detail, "agent step failed");
                    return Termination::Failed(detail);
                }
            }
        }
        Termination::Exhausted
    }));

    let termination = outcome.unwrap_or_else(|payload| {
        let detail = panic_message(payload.as_ref());
        tracing::error!(panic = %detail, "agent producer panicked");
        Termination::Panicked(detail)
    });
    tracing::debug!(?termination, "agent producer stopped");
    let _ = tx.send(Envelope::End(termination));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
