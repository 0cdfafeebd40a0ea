use async_trait::async_trait;
use http::StatusCode;
use spool_http::handler::{Handler, HandlerError};
use spool_http::protocol::{Request, Response};
use tracing::debug;

/// Answers every `POST` with its own payload and content type. The other methods keep the
/// default `405` responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn post(&self, request: &Request) -> Result<Response, HandlerError> {
        debug!(uri = request.uri(), len = request.payload().len(), "echoing payload");

        let response = Response::new(StatusCode::OK, request.payload().clone());
        Ok(match request.content_type() {
            Some(content_type) => response.with_mime_type(content_type),
            None => response,
        })
    }
}
