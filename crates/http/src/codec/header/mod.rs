//! Header section codecs.
//!
//! - [`HeaderDecoder`]: request line and header fields, bounded by [`MAX_HEADER_BYTES`]
//! - [`HeaderEncoder`]: status line, `Content-Type`, `Date`, caller headers and the framing
//!   header of a response

mod header_decoder;
mod header_encoder;

pub use header_decoder::{HeaderDecoder, MAX_HEADER_BYTES, parse_head};
pub use header_encoder::HeaderEncoder;
