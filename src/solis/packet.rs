use crate::prelude::*;

use bytes::Bytes;
use nom_derive::{Nom, Parse};
use num_enum::{IntoPrimitive, TryFromPrimitive};

pub const START_BYTE: u8 = 0xA5;
pub const END_BYTE: u8 = 0x15;
pub const HEADER_LEN: usize = 11;
pub const FOOTER_LEN: usize = 2;

// {{{ MsgType
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MsgType {
    Heartbeat = 0x41,
    Data = 0x42,
}
// }}}

// {{{ MessageKind
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageKind {
    Heartbeat,
    Data,
    Unknown(u8),
}

impl From<u8> for MessageKind {
    fn from(msg_type: u8) -> Self {
        match MsgType::try_from(msg_type) {
            Ok(MsgType::Heartbeat) => Self::Heartbeat,
            Ok(MsgType::Data) => Self::Data,
            Err(_) => Self::Unknown(msg_type),
        }
    }
}
// }}}

// {{{ FrameHeader
#[derive(Clone, Copy, Debug, Eq, PartialEq, Nom)]
#[nom(LittleEndian)]
pub struct FrameHeader {
    #[nom(SkipBefore(1))] // start marker
    pub payload_length: u16,
    #[nom(SkipBefore(1))] // reserved
    pub msg_type: u8,
    pub resp_index: u8,
    pub req_index: u8,
    pub serial_number: u32,
}

impl FrameHeader {
    pub fn decode(input: &[u8]) -> Result<Self, FrameError> {
        match Self::parse(input) {
            Ok((_, header)) => Ok(header),
            Err(_) => Err(FrameError::ShortRead {
                have: input.len(),
                need: HEADER_LEN,
            }),
        }
    }

    /// Total length of the frame this header announces, markers included.
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + self.payload_length as usize + FOOTER_LEN
    }

    pub fn kind(&self) -> MessageKind {
        MessageKind::from(self.msg_type)
    }
}
// }}}

// {{{ Frame
/// One validated message, kept as the exact bytes that came off the wire so
/// it can be relayed upstream untouched.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    header: FrameHeader,
    raw: Bytes,
}

impl Frame {
    /// Validates a complete frame.
    ///
    /// Checks run in wire order: start marker, end marker, then the checksum
    /// over everything between the start marker and the checksum byte.
    pub fn decode(raw: Bytes) -> Result<Self, FrameError> {
        if raw.len() < HEADER_LEN + FOOTER_LEN {
            return Err(FrameError::invalid(
                format!("{} bytes is shorter than an empty frame", raw.len()),
                &raw,
            ));
        }

        let header = FrameHeader::decode(&raw)?;
        if raw.len() != header.frame_len() {
            return Err(FrameError::invalid(
                format!(
                    "length mismatch: got {} bytes, header announces {}",
                    raw.len(),
                    header.frame_len()
                ),
                &raw,
            ));
        }

        let len = raw.len();
        if raw[0] != START_BYTE {
            return Err(FrameError::invalid(
                format!("bad start marker {:#04x}", raw[0]),
                &raw,
            ));
        }
        if raw[len - 1] != END_BYTE {
            return Err(FrameError::invalid(
                format!("bad end marker {:#04x}", raw[len - 1]),
                &raw,
            ));
        }

        let expected = Self::checksum(&raw[1..len - 2]);
        if raw[len - 2] != expected {
            return Err(FrameError::invalid(
                format!(
                    "checksum mismatch - got {:#04x}, expected {:#04x}",
                    raw[len - 2],
                    expected
                ),
                &raw,
            ));
        }

        Ok(Self { header, raw })
    }

    /// Builds a frame around `payload`, filling in length, checksum and markers.
    pub fn encode(
        reserved: u8,
        msg_type: u8,
        resp_index: u8,
        req_index: u8,
        serial_number: u32,
        payload: &[u8],
    ) -> Result<Self> {
        let payload_length = u16::try_from(payload.len())
            .map_err(|_| anyhow!("payload of {} bytes does not fit a frame", payload.len()))?;

        let mut r = Vec::with_capacity(HEADER_LEN + payload.len() + FOOTER_LEN);
        r.push(START_BYTE);
        r.extend_from_slice(&payload_length.to_le_bytes());
        r.push(reserved);
        r.push(msg_type);
        r.push(resp_index);
        r.push(req_index);
        r.extend_from_slice(&serial_number.to_le_bytes());
        r.extend_from_slice(payload);
        r.push(Self::checksum(&r[1..]));
        r.push(END_BYTE);

        Ok(Self::decode(Bytes::from(r))?)
    }

    /// 8-bit additive LRC, not a CRC.
    pub fn checksum(data: &[u8]) -> u8 {
        data.iter().fold(0u8, |lrc, b| lrc.wrapping_add(*b))
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn kind(&self) -> MessageKind {
        self.header.kind()
    }

    pub fn payload(&self) -> &[u8] {
        &self.raw[HEADER_LEN..self.raw.len() - FOOTER_LEN]
    }

    pub fn checksum_byte(&self) -> u8 {
        self.raw[self.raw.len() - 2]
    }

    pub fn bytes(&self) -> &Bytes {
        &self.raw
    }

    pub fn into_bytes(self) -> Bytes {
        self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn hex(&self) -> String {
        Utils::hex(&self.raw)
    }
}
// }}}

// {{{ ReplyFactory
/// Builds the acknowledgement the vendor collector would have sent.
///
/// The logger only checks framing, checksum and the echoed indices, so a
/// locally built reply is indistinguishable from a forwarded one.
pub struct ReplyFactory;

impl ReplyFactory {
    pub const PAYLOAD_LEN: usize = 10;
    const CONTROL: u8 = 0x10;
    const RESPONSE_OFFSET: u8 = 0x30;

    pub fn build(request: &Frame, unix_time: u32) -> Result<Frame> {
        // an empty request echoes the start marker
        let first = request.payload().first().copied().unwrap_or(START_BYTE);

        let mut payload = Vec::with_capacity(Self::PAYLOAD_LEN);
        payload.push(first);
        payload.push(0x01);
        payload.extend_from_slice(&unix_time.to_le_bytes());
        // meaning unknown, but the real server always sends these
        payload.extend_from_slice(&[0xAA, 0xAA, 0x00, 0x00]);

        let header = request.header();
        Frame::encode(
            Self::CONTROL,
            header.msg_type.wrapping_sub(Self::RESPONSE_OFFSET),
            header.req_index,
            header.req_index,
            header.serial_number,
            &payload,
        )
    }
}
// }}}
