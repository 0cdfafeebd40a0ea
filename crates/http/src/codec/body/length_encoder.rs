use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

use crate::protocol::{PayloadItem, SendError};

/// `Content-Length` body framing: passes through at most `length` bytes and drops the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }

    pub fn is_finish(&self) -> bool {
        self.length == 0
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let PayloadItem::Chunk(bytes) = item else {
            return Ok(());
        };

        if self.length == 0 {
            if bytes.has_remaining() {
                warn!(extra = bytes.remaining(), "payload exceeds declared content-length, dropped");
            }
            return Ok(());
        }

        let take = usize::try_from(self.length).map_or(bytes.remaining(), |length| length.min(bytes.remaining()));
        dst.put(bytes.take(take));
        self.length -= take as u64;
        Ok(())
    }
}
