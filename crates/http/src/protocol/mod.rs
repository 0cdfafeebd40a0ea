//! Core HTTP protocol types.
//!
//! - **Messages** ([`message`]): [`Message`], [`PayloadItem`] and [`PayloadSize`] feed the
//!   response encoder
//! - **Requests** ([`request`]): the parsed, read-only [`Request`]
//! - **Responses** ([`response`]): [`Response`], its [`ResponseHead`] and [`ResponseBody`]
//! - **Methods** ([`method`]): the six supported [`Method`]s
//! - **Errors** ([`error`]): [`HttpError`], [`ParseError`] and [`SendError`]
//!
//! The protocol types are normally driven by the connection layer; handlers only see
//! [`Request`] and build [`Response`].

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod method;
pub use method::Method;

mod request;
pub use request::PUT_CONTENT_FIELD;
pub use request::Request;
pub use request::RequestHead;

mod response;
pub use response::Response;
pub use response::ResponseBody;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
