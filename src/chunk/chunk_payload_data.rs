use std::fmt;
use std::time::Instant;

use bytes::{BufMut, Bytes, BytesMut};

use super::chunk_header::*;
use super::chunk_type::*;
use super::Chunk;
use crate::association::transport::TransportId;
use crate::error::Result;

pub(crate) const PAYLOAD_DATA_ENDING_FRAGMENT_BITMASK: u8 = 1;
pub(crate) const PAYLOAD_DATA_BEGINNING_FRAGMENT_BITMASK: u8 = 2;
pub(crate) const PAYLOAD_DATA_UNORDERED_BITMASK: u8 = 4;
pub(crate) const PAYLOAD_DATA_IMMEDIATE_SACK: u8 = 8;
pub(crate) const PAYLOAD_DATA_HEADER_SIZE: usize = 12;

/// Full on-wire size of a DATA chunk with an empty payload: chunk header
/// plus the TSN/stream/PPI fields.
pub const DATA_CHUNK_HEADER_SIZE: usize = CHUNK_HEADER_SIZE + PAYLOAD_DATA_HEADER_SIZE;

/// Fast-retransmit disposition of a DATA chunk, driven by the SACK
/// gap-report machinery that owns the retransmission queue.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum FastRetransmit {
    /// May be fast-retransmitted if enough misses accumulate.
    #[default]
    Eligible,
    /// Marked for fast retransmission; ignores the congestion window once.
    Needed,
    /// Already fast-retransmitted; wait for the T3 timer instead.
    Suppressed,
}

/// ChunkPayloadData represents an SCTP chunk of type DATA, together with
/// the sender-side bookkeeping the packetizer maintains for it.
///
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|   Type = 0    | Reserved|U|B|E|    Length                     |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                              TSN                              |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|      Stream Identifier S      |   Stream Sequence Number n    |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                  Payload Protocol Identifier                  |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///|                                                               |
///|                 User Data (seq n of Stream S)                 |
///|                                                               |
///+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///
/// An unfragmented user message has both the B and E bits set; B alone
/// marks the first fragment, E alone the last, neither a middle piece.
#[derive(Debug, Clone)]
pub struct ChunkPayloadData {
    pub unordered: bool,
    pub beginning_fragment: bool,
    pub ending_fragment: bool,
    pub immediate_sack: bool,

    pub tsn: u32,
    pub stream_identifier: u16,
    pub stream_sequence_number: u16,
    pub payload_protocol_identifier: u32,
    pub user_data: Bytes,

    /// Transmission timestamp of the most recent send, for RTT sampling.
    pub sent_at: Option<Instant>,
    /// Number of transmissions made for this chunk.
    pub nsent: u32,
    /// This transmission is a retransmission; it must not feed RTT samples.
    pub resent: bool,
    /// This chunk is the transport's current RTT probe.
    pub rtt_in_progress: bool,
    pub fast_retransmit: FastRetransmit,

    /// A TSN has been assigned; assignment happens once, on first admission.
    pub has_tsn: bool,
    /// The owning message tolerates Nagle-style delay.
    pub can_delay: bool,
    /// The owning message may still be abandoned (partial reliability).
    pub can_abandon: bool,
    /// Transport this chunk was packetized for.
    pub transport: Option<TransportId>,
}

impl Default for ChunkPayloadData {
    fn default() -> Self {
        ChunkPayloadData {
            unordered: false,
            beginning_fragment: true,
            ending_fragment: true,
            immediate_sack: false,
            tsn: 0,
            stream_identifier: 0,
            stream_sequence_number: 0,
            payload_protocol_identifier: 0,
            user_data: Bytes::new(),
            sent_at: None,
            nsent: 0,
            resent: false,
            rtt_in_progress: false,
            fast_retransmit: FastRetransmit::default(),
            has_tsn: false,
            can_delay: false,
            can_abandon: false,
            transport: None,
        }
    }
}

/// makes ChunkPayloadData printable
impl fmt::Display for ChunkPayloadData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.header(), self.tsn)
    }
}

impl Chunk for ChunkPayloadData {
    fn header(&self) -> ChunkHeader {
        let mut flags: u8 = 0;
        if self.ending_fragment {
            flags = PAYLOAD_DATA_ENDING_FRAGMENT_BITMASK;
        }
        if self.beginning_fragment {
            flags |= PAYLOAD_DATA_BEGINNING_FRAGMENT_BITMASK;
        }
        if self.unordered {
            flags |= PAYLOAD_DATA_UNORDERED_BITMASK;
        }
        if self.immediate_sack {
            flags |= PAYLOAD_DATA_IMMEDIATE_SACK;
        }

        ChunkHeader {
            typ: CT_PAYLOAD_DATA,
            flags,
            value_length: self.value_length() as u16,
        }
    }

    fn marshal_to(&self, writer: &mut BytesMut) -> Result<usize> {
        self.header().marshal_to(writer)?;

        writer.put_u32(self.tsn);
        writer.put_u16(self.stream_identifier);
        writer.put_u16(self.stream_sequence_number);
        writer.put_u32(self.payload_protocol_identifier);
        writer.extend_from_slice(&self.user_data);

        Ok(writer.len())
    }

    fn value_length(&self) -> usize {
        PAYLOAD_DATA_HEADER_SIZE + self.user_data.len()
    }
}

impl ChunkPayloadData {
    /// User-data byte count, the unit all window accounting runs in.
    pub fn data_size(&self) -> usize {
        self.user_data.len()
    }

    /// On-wire length of header and value, without trailing padding.
    pub fn serialized_len(&self) -> usize {
        CHUNK_HEADER_SIZE + self.value_length()
    }
}
