pub mod transport;

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use rand::random;

use crate::auth::AuthContext;
use crate::chunk::chunk_auth::ChunkAuth;
use crate::chunk::chunk_payload_data::ChunkPayloadData;
use crate::chunk::chunk_selective_ack::ChunkSelectiveAck;
use crate::chunk::chunk_type::{ChunkType, CT_AUTH};
use crate::error::Error;
use transport::TransportId;

pub(crate) const INITIAL_MTU: u32 = 1500;
pub(crate) const INITIAL_RECV_WINDOW: u32 = 1024 * 1024;

/// State of an association, per RFC 4960 section 4. The packetizer only
/// branches on `Established` (Nagle) but keeps the full ladder so callers
/// drive one shared enum.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AssociationState {
    #[default]
    Closed,
    CookieWait,
    CookieEchoed,
    Established,
    ShutdownAckSent,
    ShutdownPending,
    ShutdownReceived,
    ShutdownSent,
}

impl fmt::Display for AssociationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            AssociationState::Closed => "Closed",
            AssociationState::CookieWait => "CookieWait",
            AssociationState::CookieEchoed => "CookieEchoed",
            AssociationState::Established => "Established",
            AssociationState::ShutdownAckSent => "ShutdownAckSent",
            AssociationState::ShutdownPending => "ShutdownPending",
            AssociationState::ShutdownReceived => "ShutdownReceived",
            AssociationState::ShutdownSent => "ShutdownSent",
        };
        write!(f, "{s}")
    }
}

/// What we know about the peer endpoint.
#[derive(Debug, Clone, Default)]
pub struct Peer {
    /// Our running view of the peer's receive window.
    pub rwnd: u32,
    /// A SACK is owed to the peer.
    pub sack_needed: bool,
    /// Bumped whenever the SACK state changes; transports carry the
    /// generation they last saw.
    pub sack_generation: u32,
    /// Peer negotiated the partial-reliability extension.
    pub prsctp_capable: bool,
    /// Peer negotiated ECN.
    pub ecn_capable: bool,
    /// Chunk types the peer asked us to authenticate (RFC 4895 CHUNKS
    /// parameter).
    pub auth_chunk_types: Vec<ChunkType>,
}

/// Plain counters, mutated under the association lock.
#[derive(Debug, Default, Clone)]
pub struct AssociationStats {
    n_out_packets: u64,
    n_out_no_routes: u64,
    n_sacks_out: u64,
}

impl AssociationStats {
    pub(crate) fn inc_out_packets(&mut self) {
        self.n_out_packets += 1;
    }

    pub fn get_num_out_packets(&self) -> u64 {
        self.n_out_packets
    }

    pub(crate) fn inc_out_no_routes(&mut self) {
        self.n_out_no_routes += 1;
    }

    pub fn get_num_out_no_routes(&self) -> u64 {
        self.n_out_no_routes
    }

    pub(crate) fn inc_sacks_out(&mut self) {
        self.n_sacks_out += 1;
    }

    pub fn get_num_sacks_out(&self) -> u64 {
        self.n_sacks_out
    }
}

/// The originating socket's slots the packetizer touches: the error the
/// serializer parks on fatal route/build failures, and the write-memory
/// the socket stays pinned for until the network layer finishes with an
/// emitted packet.
#[derive(Debug, Default, Clone)]
pub struct Socket {
    pub err: Option<Error>,
    pub wmem_queued: usize,
}

impl Socket {
    pub(crate) fn charge(&mut self, nbytes: usize) {
        self.wmem_queued += nbytes;
    }

    /// Called by whoever owns an emitted packet once transmission
    /// completes, releasing the memory it pinned.
    pub fn uncharge(&mut self, nbytes: usize) {
        self.wmem_queued = self.wmem_queued.saturating_sub(nbytes);
    }
}

/// The slice of association state the packetizer consumes and mutates.
///
/// The association state machine, the outbound queue and the timer service
/// own the rest of the association; everything here is mutated in the
/// sending context with the association lock held by the caller.
#[derive(Debug)]
pub struct Association {
    pub name: String,
    pub state: AssociationState,
    pub peer_verification_tag: u32,
    pub source_port: u16,
    pub destination_port: u16,

    pub(crate) my_next_tsn: u32,
    ssn: HashMap<u16, u16>,

    pub peer: Peer,

    /// Bytes handed to the wire and not yet acknowledged, association-wide
    /// (the outbound queue's view).
    pub outstanding_bytes: u32,
    /// User bytes still queued for transmission.
    pub out_qlen: u32,

    /// Our receive window, advertised as a_rwnd in outgoing SACKs.
    pub my_rwnd: u32,
    /// Highest cumulative TSN received in sequence from the peer.
    pub peer_last_tsn: u32,

    /// Nagle disabled: small chunks go out immediately.
    pub nodelay: bool,
    /// Path-MTU discovery armed; the serializer resyncs pathmtu from the
    /// refreshed route.
    pub pmtu_discovery: bool,
    /// Smallest path MTU across the association's transports.
    pub pathmtu: u32,

    /// The delayed-SACK timer is running.
    pub sack_timer_armed: bool,
    pub autoclose: Option<Duration>,
    pub autoclose_deadline: Option<Instant>,

    pub auth: Option<AuthContext>,

    pub last_sent_to: Option<TransportId>,
    pub stats: AssociationStats,
    pub socket: Socket,
}

impl Association {
    pub fn new(
        name: String,
        source_port: u16,
        destination_port: u16,
        peer_verification_tag: u32,
    ) -> Self {
        let mut tsn = random::<u32>();
        if tsn == 0 {
            tsn += 1;
        }

        Association {
            name,
            state: AssociationState::Closed,
            peer_verification_tag,
            source_port,
            destination_port,
            my_next_tsn: tsn,
            ssn: HashMap::new(),
            peer: Peer::default(),
            outstanding_bytes: 0,
            out_qlen: 0,
            my_rwnd: INITIAL_RECV_WINDOW,
            peer_last_tsn: 0,
            nodelay: false,
            pmtu_discovery: false,
            pathmtu: INITIAL_MTU,
            sack_timer_armed: false,
            autoclose: None,
            autoclose_deadline: None,
            auth: None,
            last_sent_to: None,
            stats: AssociationStats::default(),
            socket: Socket::default(),
        }
    }

    pub(crate) fn next_tsn(&mut self) -> u32 {
        let tsn = self.my_next_tsn;
        self.my_next_tsn = self.my_next_tsn.wrapping_add(1);
        tsn
    }

    /// Stamps the stream sequence number on an ordered DATA chunk. All
    /// fragments of one message share the stream's current number; the
    /// allocator advances past it once the ending fragment is stamped.
    pub(crate) fn assign_ssn(&mut self, chunk: &mut ChunkPayloadData) {
        if chunk.unordered {
            return;
        }
        let ssn = self.ssn.entry(chunk.stream_identifier).or_insert(0);
        chunk.stream_sequence_number = *ssn;
        if chunk.ending_fragment {
            *ssn = ssn.wrapping_add(1);
        }
    }

    /// A SACK reflecting the current receive state, for piggybacking on an
    /// outgoing DATA packet.
    pub fn make_sack(&self) -> ChunkSelectiveAck {
        ChunkSelectiveAck {
            cumulative_tsn_ack: self.peer_last_tsn,
            advertised_receiver_window_credit: self.my_rwnd,
            gap_ack_blocks: vec![],
            duplicate_tsn: vec![],
        }
    }

    /// An AUTH chunk with a zeroed MAC, ready for back-patching at
    /// serialization time. None when SCTP-AUTH was not negotiated.
    pub fn make_auth(&self) -> Option<ChunkAuth> {
        let auth = self.auth.as_ref()?;
        Some(ChunkAuth::new(auth.active_key_id, auth.algorithm))
    }

    /// Whether the peer asked for this chunk type to be authenticated.
    /// AUTH itself is never authenticated (RFC 4895 section 6.3).
    pub(crate) fn peer_requests_auth(&self, ct: ChunkType) -> bool {
        self.auth.is_some() && ct != CT_AUTH && self.peer.auth_chunk_types.contains(&ct)
    }

    pub(crate) fn restart_autoclose(&mut self) {
        if let Some(timeout) = self.autoclose {
            self.autoclose_deadline = Some(Instant::now() + timeout);
        }
    }
}
