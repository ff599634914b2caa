use crate::prelude::*;
use crate::solis::packet::HEADER_LEN;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Splits a logger's byte stream into validated frames.
///
/// A frame is only emitted once all `11 + payload_length + 2` bytes are
/// buffered, and never consumes bytes past its own end, so back-to-back
/// frames on one connection come out one at a time.
#[derive(Debug, Default)]
pub struct PacketDecoder;

impl PacketDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for PacketDecoder {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if src.len() < HEADER_LEN {
            src.reserve(HEADER_LEN - src.len());
            return Ok(None);
        }

        let header = FrameHeader::decode(&src[..HEADER_LEN])?;
        let frame_len = header.frame_len();

        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let raw = src.split_to(frame_len).freeze();
        Frame::decode(raw).map(Some)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }

        if buf.len() < HEADER_LEN {
            // the logger hung up between messages; a partial header is not an error
            if !buf.is_empty() {
                debug!("discarding {} trailing bytes at end of stream", buf.len());
                buf.clear();
            }
            return Ok(None);
        }

        let header = FrameHeader::decode(&buf[..HEADER_LEN])?;
        Err(FrameError::ShortRead {
            have: buf.len(),
            need: header.frame_len(),
        })
    }
}
