//! Request handler trait.
//!
//! A [`Handler`] turns a parsed [`Request`] into a [`Response`], one async method per supported
//! [`Method`]. Every method defaults to a `405 Method Not Allowed` plaintext response, so an
//! implementation only overrides what it serves.
//!
//! Returning an error, or panicking, makes the connection answer `500` with the error message.

use std::error::Error;

use async_trait::async_trait;

use crate::protocol::{Method, Request, Response};

/// Error type handlers may return.
pub type HandlerError = Box<dyn Error + Send + Sync>;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn get(&self, _request: &Request) -> Result<Response, HandlerError> {
        Ok(Response::method_not_allowed(Method::Get))
    }

    async fn post(&self, _request: &Request) -> Result<Response, HandlerError> {
        Ok(Response::method_not_allowed(Method::Post))
    }

    async fn put(&self, _request: &Request) -> Result<Response, HandlerError> {
        Ok(Response::method_not_allowed(Method::Put))
    }

    async fn delete(&self, _request: &Request) -> Result<Response, HandlerError> {
        Ok(Response::method_not_allowed(Method::Delete))
    }

    async fn head(&self, _request: &Request) -> Result<Response, HandlerError> {
        Ok(Response::method_not_allowed(Method::Head))
    }

    async fn options(&self, _request: &Request) -> Result<Response, HandlerError> {
        Ok(Response::method_not_allowed(Method::Options))
    }

    /// Routes `request` to the method-specific handler.
    async fn dispatch(&self, request: &Request) -> Result<Response, HandlerError> {
        match request.method() {
            Method::Get => self.get(request).await,
            Method::Post => self.post(request).await,
            Method::Put => self.put(request).await,
            Method::Delete => self.delete(request).await,
            Method::Head => self.head(request).await,
            Method::Options => self.options(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_head;
    use http::StatusCode;

    struct HeadOnly;

    #[async_trait]
    impl Handler for HeadOnly {
        async fn head(&self, request: &Request) -> Result<Response, HandlerError> {
            Ok(Response::text(StatusCode::OK, request.uri().to_string()))
        }

        async fn put(&self, _request: &Request) -> Result<Response, HandlerError> {
            Err("put must not be reached".into())
        }
    }

    fn request(raw: &[u8]) -> Request {
        Request::from(parse_head(raw).unwrap())
    }

    #[tokio::test]
    async fn head_routes_to_head() {
        let response = HeadOnly.dispatch(&request(b"HEAD /x HTTP/1.1\r\n\r\n")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn defaults_are_method_not_allowed() {
        let requests: [&[u8]; 4] =
            [b"GET / HTTP/1.1\r\n\r\n", b"POST / HTTP/1.1\r\n\r\n", b"DELETE / HTTP/1.1\r\n\r\n", b"OPTIONS * HTTP/1.1\r\n\r\n"];
        for raw in requests {
            let response = HeadOnly.dispatch(&request(raw)).await.unwrap();
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(response.mime_type(), Some("text/plain"));
        }
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let result = HeadOnly.dispatch(&request(b"PUT / HTTP/1.1\r\n\r\n")).await;
        assert!(matches!(result, Err(e) if e.to_string() == "put must not be reached"));
    }
}
