use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use super::Chunk;
use crate::auth::HmacAlgorithm;
use crate::error::Result;

/// Byte offset of the HMAC field within a serialized AUTH chunk.
pub(crate) const AUTH_MAC_OFFSET: usize = CHUNK_HEADER_SIZE + 4;

/// ChunkAuth represents an SCTP chunk of type AUTH, defined in
/// https://tools.ietf.org/html/rfc4895#section-4.1
///
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///| Type = 0x0F   |   Flags=0     |             Length            |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|     Shared Key Identifier     |   HMAC Identifier             |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                                                               |
///\                             HMAC                              /
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///
/// The chunk is built with the HMAC field zeroed; the serializer computes
/// the MAC over the chunk and everything bundled after it, then patches
/// the field in place.
#[derive(Debug, Clone)]
pub struct ChunkAuth {
    pub shared_key_id: u16,
    pub algorithm: HmacAlgorithm,
    pub hmac: Bytes,
}

/// makes ChunkAuth printable
impl fmt::Display for ChunkAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} keyId={} hmacId={}", self.header(), self.shared_key_id, self.algorithm.id())
    }
}

impl Chunk for ChunkAuth {
    fn header(&self) -> ChunkHeader {
        ChunkHeader {
            typ: CT_AUTH,
            flags: 0,
            value_length: self.value_length() as u16,
        }
    }

    fn marshal_to(&self, buf: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(buf)?;
        buf.put_u16(self.shared_key_id);
        buf.put_u16(self.algorithm.id());
        buf.extend_from_slice(&self.hmac);
        Ok(buf.len())
    }

    fn value_length(&self) -> usize {
        4 + self.hmac.len()
    }
}

impl ChunkAuth {
    /// An AUTH chunk carrying an all-zero MAC of the algorithm's width.
    pub fn new(shared_key_id: u16, algorithm: HmacAlgorithm) -> Self {
        ChunkAuth {
            shared_key_id,
            algorithm,
            hmac: Bytes::from(vec![0u8; algorithm.mac_len()]),
        }
    }
}
