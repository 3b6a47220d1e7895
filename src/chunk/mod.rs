#[cfg(test)]
mod chunk_test;

pub mod chunk_auth;
pub mod chunk_cookie_echo;
pub mod chunk_header;
pub mod chunk_heartbeat;
pub mod chunk_payload_data;
pub mod chunk_selective_ack;
pub mod chunk_type;

use std::fmt;

use bytes::{Bytes, BytesMut};
use chunk_auth::ChunkAuth;
use chunk_cookie_echo::ChunkCookieEcho;
use chunk_header::*;
use chunk_payload_data::ChunkPayloadData;
use chunk_selective_ack::ChunkSelectiveAck;
use chunk_type::*;

use crate::error::{Error, Result};
use crate::util::pad4;

/// A chunk that can be placed into an outgoing SCTP packet.
///
/// Implementations describe themselves through a [`ChunkHeader`] and write
/// their header and value (without trailing padding) into a buffer; padding
/// is the packet serializer's business.
pub trait Chunk: fmt::Display + fmt::Debug {
    fn header(&self) -> ChunkHeader;
    fn marshal_to(&self, buf: &mut BytesMut) -> Result<usize>;
    fn value_length(&self) -> usize;

    fn marshal(&self) -> Result<Bytes> {
        let capacity = CHUNK_HEADER_SIZE + self.value_length();
        let mut buf = BytesMut::with_capacity(capacity);
        self.marshal_to(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// A chunk queued for transmission, as handed to the packetizer by the
/// outbound queue.
///
/// The packetizer gives DATA, SACK, AUTH and COOKIE ECHO chunks special
/// treatment (flow-control accounting, bundling, MAC patching, flush
/// exemption); every other control chunk passes through opaquely.
#[derive(Debug)]
pub enum OutboundChunk {
    Data(ChunkPayloadData),
    Sack(ChunkSelectiveAck),
    Auth(ChunkAuth),
    CookieEcho(ChunkCookieEcho),
    Control(Box<dyn Chunk + Send + Sync>),
}

impl OutboundChunk {
    pub fn chunk_type(&self) -> ChunkType {
        match self {
            OutboundChunk::Data(_) => CT_PAYLOAD_DATA,
            OutboundChunk::Sack(_) => CT_SACK,
            OutboundChunk::Auth(_) => CT_AUTH,
            OutboundChunk::CookieEcho(_) => CT_COOKIE_ECHO,
            OutboundChunk::Control(c) => c.header().typ,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, OutboundChunk::Data(_))
    }

    /// On-wire length of header and value, without trailing padding.
    pub fn serialized_len(&self) -> usize {
        CHUNK_HEADER_SIZE + self.as_chunk().value_length()
    }

    /// On-wire length including the trailing padding to the 4-byte boundary.
    pub fn padded_len(&self) -> usize {
        pad4(self.serialized_len())
    }

    pub(crate) fn as_chunk(&self) -> &dyn Chunk {
        match self {
            OutboundChunk::Data(c) => c,
            OutboundChunk::Sack(c) => c,
            OutboundChunk::Auth(c) => c,
            OutboundChunk::CookieEcho(c) => c,
            OutboundChunk::Control(c) => c.as_ref(),
        }
    }

    pub(crate) fn marshal_to(&self, buf: &mut BytesMut) -> Result<usize> {
        if self.serialized_len() > u16::MAX as usize {
            return Err(Error::ErrChunkValueTooLong);
        }
        self.as_chunk().marshal_to(buf)
    }
}

/// makes OutboundChunk printable
impl fmt::Display for OutboundChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_chunk())
    }
}
