//! Event pipeline: buffer, producer hand-off and the consumer loop.
//!
//! ```text
//! capture source ─► EventProducer ─► EventBuffer ─► ConsumerLoop ─► KeyboardDispatcher
//!   (any thread)                      (mutex)       (own thread)
//! ```

pub mod buffer;
pub mod consumer;
pub mod producer;

pub use buffer::EventBuffer;
pub use consumer::{ConsumerLoop, DispatchFailure};
pub use producer::{EventProducer, RawKeySink};
