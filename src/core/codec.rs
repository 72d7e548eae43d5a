// src/core/codec.rs

//! Implements the wire frame structure and the corresponding `Encoder`/`Decoder`
//! for network communication: `(opcode: u16, payload: bytes)` per spec §6.

use crate::core::errors::EngineError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Protocol-level limit to prevent a malformed length prefix from causing an
/// unbounded allocation.
const MAX_PAYLOAD_BYTES: u32 = 64 * 1024 * 1024;

const HEADER_LEN: usize = 2 + 4;

/// A single framed message: a 16-bit opcode and an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub opcode: u16,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(opcode: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }
}

/// A `tokio_util::codec` implementation for encoding and decoding `Frame`s as
/// `[opcode: u16][len: u32][payload: len bytes]`.
#[derive(Debug, Default)]
pub struct MatchFrameCodec;

impl Encoder<Frame> for MatchFrameCodec {
    type Error = EngineError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.payload.len() as u64 > MAX_PAYLOAD_BYTES as u64 {
            return Err(EngineError::Protocol("outbound payload too large".into()));
        }
        dst.reserve(HEADER_LEN + item.payload.len());
        dst.put_u16(item.opcode);
        dst.put_u32(item.payload.len() as u32);
        dst.extend_from_slice(&item.payload);
        Ok(())
    }
}

impl Decoder for MatchFrameCodec {
    type Item = Frame;
    type Error = EngineError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let mut header = &src[..HEADER_LEN];
        let opcode = header.get_u16();
        let len = header.get_u32();

        if len > MAX_PAYLOAD_BYTES {
            return Err(EngineError::Protocol(format!(
                "frame payload of {len} bytes exceeds the {MAX_PAYLOAD_BYTES} byte limit"
            )));
        }

        let total_len = HEADER_LEN + len as usize;
        if src.len() < total_len {
            src.reserve(total_len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(len as usize).freeze();
        Ok(Some(Frame { opcode, payload }))
    }
}
