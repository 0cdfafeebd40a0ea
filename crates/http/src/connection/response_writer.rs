use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::codec::ResponseEncoder;
use crate::protocol::{Message, Method, PayloadItem, PayloadSize, Response, ResponseHead, SendError};

/// Size of each read from a response body.
pub const RESPONSE_CHUNK_SIZE: usize = 16 * 1024;

/// Serializes [`Response`]s onto a writer through a [`ResponseEncoder`].
#[derive(Debug)]
pub struct ResponseWriter<W> {
    writer: W,
    buffer: BytesMut,
    encoder: ResponseEncoder,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, RESPONSE_CHUNK_SIZE + 1024)
    }

    pub fn with_capacity(writer: W, buffer_size: usize) -> Self {
        Self { writer, buffer: BytesMut::with_capacity(buffer_size), encoder: ResponseEncoder::new() }
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes the whole response and flushes the writer. The response body is dropped on return,
    /// whether or not sending succeeded.
    ///
    /// A `HEAD` response, recognized through [`Response::request_method`], is always framed with
    /// a fixed length equal to the bytes the body has available, and no body bytes are sent. A
    /// fixed-length body is copied until the declared length is reached or the body runs dry.
    pub async fn send(&mut self, response: Response) -> Result<(), SendError> {
        let (head, mut body, request_method, chunked) = response.into_parts();
        let is_head = request_method == Some(Method::Head);

        let payload_size = if chunked && !is_head { PayloadSize::Chunked } else { PayloadSize::fixed(body.available()) };
        trace!(status = head.status().as_u16(), ?payload_size, is_head, "sending response");

        self.write(Message::<_, Bytes>::Header((head, payload_size)))?;

        if !is_head {
            let mut buf = vec![0u8; RESPONSE_CHUNK_SIZE];
            match payload_size {
                PayloadSize::Chunked => loop {
                    let read = body.read(&mut buf).await?;
                    if read == 0 {
                        break;
                    }
                    self.write_chunk(&buf[..read]).await?;
                },
                PayloadSize::Length(mut remaining) => {
                    while remaining > 0 {
                        let want = usize::try_from(remaining).map_or(RESPONSE_CHUNK_SIZE, |remaining| remaining.min(RESPONSE_CHUNK_SIZE));
                        let read = body.read(&mut buf[..want]).await?;
                        if read == 0 {
                            break;
                        }
                        self.write_chunk(&buf[..read]).await?;
                        remaining -= read as u64;
                    }
                }
                PayloadSize::Empty => {}
            }
        }

        self.write(Message::<_, Bytes>::Payload(PayloadItem::Eof))?;
        self.flush().await
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), SendError> {
        self.write(Message::Payload(PayloadItem::Chunk(chunk)))?;
        self.write_buffer().await
    }

    #[inline]
    fn write<D>(&mut self, item: Message<(ResponseHead, PayloadSize), D>) -> Result<(), SendError>
    where
        D: Buf,
    {
        self.encoder.encode(item, &mut self.buffer)
    }

    async fn write_buffer(&mut self) -> Result<(), SendError> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer).await?;
            self.buffer.clear();
        }
        Ok(())
    }

    #[inline]
    pub async fn flush(&mut self) -> Result<(), SendError> {
        self.write_buffer().await?;
        Ok(self.writer.flush().await?)
    }
}
