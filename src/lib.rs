//! Outbound packetization core for the SCTP transport protocol
//!
//! [SCTP](https://en.wikipedia.org/wiki/Stream_Control_Transmission_Protocol),
//! defined in RFC 4960, frames application messages and control traffic as
//! chunks and bundles them into packets per peer transport address. This
//! crate is the sending half of that bundling: the outbound queue offers
//! chunks one at a time, the [`packet::Packet`] accumulator admits or
//! refuses them under receiver-window, congestion-window, path-MTU and
//! bundling rules, and the serializer turns the accumulated list into wire
//! buffers (a single datagram, or a segmentation-offload super-packet)
//! complete with checksum and optional per-packet authentication.
//!
//! The association state machine, retransmission queue, routing and the IP
//! send itself stay outside; they appear only as the narrow views in
//! [`association`] and the [`emit::NetworkLayer`] trait.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod association;
pub mod auth;
pub mod chunk;
pub mod emit;
mod error;
pub mod packet;
pub(crate) mod util;

pub use crate::association::transport::{
    AddressFamily, DeviceFeatures, Route, Transport, TransportId,
};
pub use crate::association::{Association, AssociationState, AssociationStats, Peer, Socket};
pub use crate::auth::{AuthContext, HmacAlgorithm};
pub use crate::chunk::chunk_auth::ChunkAuth;
pub use crate::chunk::chunk_cookie_echo::ChunkCookieEcho;
pub use crate::chunk::chunk_header::{ChunkHeader, CHUNK_HEADER_SIZE};
pub use crate::chunk::chunk_heartbeat::ChunkHeartbeat;
pub use crate::chunk::chunk_payload_data::{
    ChunkPayloadData, FastRetransmit, DATA_CHUNK_HEADER_SIZE,
};
pub use crate::chunk::chunk_selective_ack::{ChunkSelectiveAck, GapAckBlock};
pub use crate::chunk::chunk_type::ChunkType;
pub use crate::chunk::{Chunk, OutboundChunk};
pub use crate::emit::{Checksum, GsoInfo, NetworkLayer, WirePacket, GSO_BY_FRAGS};
pub use crate::error::{Error, Result};
pub use crate::packet::{Packet, Verdict};
