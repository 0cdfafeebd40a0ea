//! Response body framing.
//!
//! - [`LengthEncoder`](length_encoder::LengthEncoder): raw bytes, capped at the declared length
//! - [`ChunkedEncoder`](chunked_encoder::ChunkedEncoder): size-prefixed chunks and a zero-size
//!   terminator
//! - [`PayloadEncoder`]: picks one of the above from a [`PayloadSize`](crate::protocol::PayloadSize)

mod chunked_encoder;
mod length_encoder;
mod payload_encoder;

pub use payload_encoder::PayloadEncoder;
