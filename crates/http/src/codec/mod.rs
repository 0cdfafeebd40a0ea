//! HTTP codec module for decoding requests and encoding responses
//!
//! # Request side
//!
//! - [`scanner`]: finds the header terminator across reads and multipart boundaries in a body
//! - [`percent`]: percent decoding of paths, query strings and urlencoded forms
//! - [`HeaderDecoder`]: a `tokio_util` [`Decoder`](tokio_util::codec::Decoder) for the
//!   request line and header fields
//! - [`multipart`]: `multipart/form-data` decomposition
//! - [`RequestDecoder`]: drives the above over a stream and spools the body to disk
//!
//! # Response side
//!
//! - [`ResponseEncoder`]: a `tokio_util` [`Encoder`](tokio_util::codec::Encoder) for a
//!   response head followed by fixed-length or chunked payload items

mod body;
mod header;
pub mod multipart;
pub mod percent;
mod request_decoder;
mod response_encoder;
pub mod scanner;

pub use header::{HeaderDecoder, HeaderEncoder, MAX_HEADER_BYTES, parse_head};
pub use request_decoder::{BODY_CHUNK_SIZE, RequestDecoder};
pub use response_encoder::ResponseEncoder;
