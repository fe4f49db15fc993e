use std::convert::Infallible;
use std::time::Duration;

use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive, KeepAliveStream};
use futures::{Stream, StreamExt, stream};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use mindsearch_core::snapshot::StreamFrame;

/// Marker sent after the last frame of a run.
pub const DONE: &str = "[DONE]";

/// Wrap an event stream in an SSE response with keep-alive.
///
/// Agent steps can take tens of seconds; the 5-second keep-alive stops
/// proxies from closing the connection in between.
pub fn sse_response<S>(stream: S) -> Sse<KeepAliveStream<S>>
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(5))
            .text("keepalive"),
    )
}

/// One frame as an SSE `data:` event.
pub fn frame_event(frame: &StreamFrame) -> Result<Event, Infallible> {
    Ok(Event::default().data(encode_or_error(frame)))
}

/// JSON for `value`, or an encoded error frame if it cannot be serialized.
fn encode_or_error<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed to encode stream frame");
        let fallback = StreamFrame::error(format!("frame encoding failed: {err}"));
        serde_json::to_string(&fallback).unwrap_or_default()
    })
}

pub fn done_event() -> Result<Event, Infallible> {
    Ok(Event::default().data(DONE))
}

/// Events for every frame received, followed by the done marker once the
/// sending side of the run closes.
pub fn frame_stream(
    rx: mpsc::Receiver<StreamFrame>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    ReceiverStream::new(rx)
        .map(|frame| frame_event(&frame))
        .chain(stream::once(async { done_event() }))
}
