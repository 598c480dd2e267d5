pub mod streaming_state;
pub mod stream_source;
pub mod streaming_controller;

pub use streaming_state::StreamingState;
pub use stream_source::{FileStreamSource, MemoryStreamSource, StreamRequest, StreamSource, StreamStatus};
pub use streaming_controller::{EvictionStats, StreamingController, StreamingUpdate};
