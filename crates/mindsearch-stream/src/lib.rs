pub mod bridge;
pub mod controller;
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bridge::{SyncBridge, Termination};
    pub use crate::controller::{RunReport, RunState, StreamController};
    pub use crate::transport::{
        ChannelTransport, CollectingTransport, JsonLinesTransport, Transport,
    };
}
