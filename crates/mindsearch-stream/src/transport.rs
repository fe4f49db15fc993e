use std::io::Write;

use async_trait::async_trait;
use tokio::sync::mpsc;

use mindsearch_core::error::TransportError;
use mindsearch_core::snapshot::StreamFrame;

/// Destination for frames produced by a run, pushed one at a time in order.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, frame: StreamFrame) -> Result<(), TransportError>;
}

/// Forwards frames into a tokio channel, e.g. to feed an SSE response.
///
/// A dropped receiver (client disconnect) surfaces as [`TransportError::Closed`].
pub struct ChannelTransport {
    tx: mpsc::Sender<StreamFrame>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::Sender<StreamFrame>) -> Self {
        Self { tx }
    }

    /// Create a transport together with the receiving end.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<StreamFrame>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, frame: StreamFrame) -> Result<(), TransportError> {
        self.tx.send(frame).await.map_err(|_| TransportError::Closed)
    }
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct CollectingTransport {
    frames: Vec<StreamFrame>,
    capacity: Option<usize>,
}

impl CollectingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `n` frames, then report the transport as closed.
    pub fn closing_after(n: usize) -> Self {
        Self {
            frames: Vec::new(),
            capacity: Some(n),
        }
    }

    pub fn frames(&self) -> &[StreamFrame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<StreamFrame> {
        self.frames
    }
}

#[async_trait]
impl Transport for CollectingTransport {
    async fn send(&mut self, frame: StreamFrame) -> Result<(), TransportError> {
        if self.capacity.is_some_and(|cap| self.frames.len() >= cap) {
            return Err(TransportError::Closed);
        }
        self.frames.push(frame);
        Ok(())
    }
}

/// Writes each frame as one line of JSON, for console rendering.
pub struct JsonLinesTransport<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesTransport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send> Transport for JsonLinesTransport<W> {
    async fn send(&mut self, frame: StreamFrame) -> Result<(), TransportError> {
        serde_json::to_writer(&mut self.writer, &frame)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
