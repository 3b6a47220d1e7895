
use std::collections::VecDeque;
use std::time::Instant;

use crate::association::transport::{Transport, TransportId};
use crate::association::{Association, AssociationState};
use crate::chunk::chunk_payload_data::{
    ChunkPayloadData, FastRetransmit, DATA_CHUNK_HEADER_SIZE,
};
use crate::chunk::chunk_type::{CT_AUTH, CT_SACK};
use crate::chunk::OutboundChunk;
use crate::emit::NetworkLayer;

pub(crate) const COMMON_HEADER_SIZE: usize = 12;

/// Slack the Nagle room computation keeps for chunk padding.
const PAYLOAD_PAD_RESERVE: usize = 4;

/// Admission outcome for one offered chunk.
///
/// Only `Ok` admits the chunk; every other verdict hands it back so the
/// outbound queue keeps ownership. `PmtuFull` means "flush, then retry";
/// `RwndFull` and `Delay` mean "keep it queued for now".
#[derive(Debug)]
#[must_use]
pub enum Verdict {
    Ok,
    /// Receiver or congestion window refuses the chunk.
    RwndFull(OutboundChunk),
    /// The packet must be flushed before this chunk can be considered.
    PmtuFull(OutboundChunk),
    /// Nagle: not enough pending data to be worth a packet yet.
    Delay(OutboundChunk),
}

impl Verdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, Verdict::Ok)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Fit {
    Ok,
    PmtuFull,
}

#[derive(Debug, PartialEq, Eq)]
enum DataFit {
    Ok,
    RwndFull,
    Delay,
}

/// The per-transport outbound accumulator.
///
/// Chunks admitted through [`Packet::append_chunk`] pile up in insertion
/// order until the serializer drains them into one or more wire packets
/// and resets the accumulator. The common-header fields committed here
/// (ports, verification tag) are written at serialization time.
#[derive(Debug)]
pub struct Packet {
    pub(crate) transport: TransportId,
    pub(crate) source_port: u16,
    pub(crate) destination_port: u16,
    pub(crate) vtag: u32,

    pub(crate) chunks: VecDeque<OutboundChunk>,
    /// Running byte count: overhead plus the padded length of every chunk.
    pub(crate) size: usize,
    /// Network-header room for the transport's address family plus the
    /// SCTP common header.
    pub(crate) overhead: usize,
    /// Segmentation-offload cap when the device offers one, else pathmtu.
    pub(crate) max_size: usize,

    pub(crate) ecn_capable: bool,
    pub(crate) has_cookie_echo: bool,
    pub(crate) has_sack: bool,
    pub(crate) has_data: bool,
    pub(crate) has_auth: bool,
    /// The network layer may fragment this packet; set when a single chunk
    /// cannot fit the path MTU on its own.
    pub(crate) ipfragok: bool,

    /// Position of the AUTH chunk in `chunks`, for size deductions and
    /// MAC back-patching.
    pub(crate) auth_index: Option<usize>,
}

impl Packet {
    /// Sets up the accumulator for one transport and port pair. Called
    /// once; the packet then cycles append/flush until dropped.
    pub fn new(transport: &Transport, source_port: u16, destination_port: u16) -> Self {
        let overhead = transport.family.net_header_len() + COMMON_HEADER_SIZE;
        Packet {
            transport: transport.id,
            source_port,
            destination_port,
            vtag: 0,
            chunks: VecDeque::new(),
            size: overhead,
            overhead,
            max_size: transport.max_packet_size() as usize,
            ecn_capable: false,
            has_cookie_echo: false,
            has_sack: false,
            has_data: false,
            has_auth: false,
            ipfragok: false,
            auth_index: None,
        }
    }

    /// Commits the verification tag and ECN capability for the packets
    /// built from here on.
    pub fn config(&mut self, vtag: u32, ecn_capable: bool) {
        self.vtag = vtag;
        self.ecn_capable = ecn_capable;
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn chunks(&self) -> impl Iterator<Item = &OutboundChunk> {
        self.chunks.iter()
    }

    fn padded_auth_len(&self) -> usize {
        self.auth_index
            .and_then(|i| self.chunks.get(i))
            .map(|c| c.padded_len())
            .unwrap_or(0)
    }

    /// Decides whether a chunk of the given padded length still fits.
    ///
    /// Beyond the path MTU the packet may keep growing only as a
    /// segmentation-offload super-packet, and then never past the device
    /// cap nor past half the congestion window.
    fn will_fit(
        &mut self,
        assoc: Option<&Association>,
        transport: &Transport,
        chunk: &OutboundChunk,
    ) -> Fit {
        let chunk_len = chunk.padded_len();
        let psize = self.size;
        let pmtu = match assoc {
            Some(a) => a.pathmtu,
            None => transport.pathmtu,
        } as usize;

        if psize + chunk_len <= pmtu {
            return Fit::Ok;
        }

        // A lone oversized chunk, or authentication growing a data-less
        // packet past the MTU: let the network layer fragment. SCTP never
        // re-fragments a built chunk.
        let requires_auth = assoc
            .map(|a| a.peer_requests_auth(chunk.chunk_type()))
            .unwrap_or(false);
        if self.chunks.is_empty() || (!self.has_data && requires_auth) {
            self.ipfragok = true;
            return Fit::Ok;
        }

        // A chunk built before a PMTU reduction can no longer share a
        // packet with anything; flush and let it travel alone.
        let maxsize = pmtu
            .saturating_sub(self.overhead)
            .saturating_sub(self.padded_auth_len());
        if chunk_len > maxsize {
            return Fit::PmtuFull;
        }

        // Trailing control on a DATA-bearing packet: flush first, the
        // control chunk starts its own packet.
        if !chunk.is_data() && self.has_data {
            return Fit::PmtuFull;
        }

        if psize + chunk_len > self.max_size {
            return Fit::PmtuFull;
        }

        // One super-packet must not consume more than half the congestion
        // window (or the burst clamp while one is active).
        let window = if transport.burst_limited == 0 {
            transport.cwnd
        } else {
            transport.burst_limited
        } as usize;
        if psize + chunk_len > window / 2 {
            return Fit::PmtuFull;
        }

        Fit::Ok
    }

    /// Flow-control gate for DATA chunks.
    fn can_append_data(
        &self,
        assoc: &Association,
        transport: &Transport,
        chunk: &ChunkPayloadData,
    ) -> DataFit {
        let datasize = chunk.data_size() as u32;
        let rwnd = assoc.peer.rwnd;
        let inflight = assoc.outstanding_bytes;
        let flight_size = transport.flight_size;

        // RFC 2960 sec 6.1.  Transmission of DATA Chunks
        //   A) At any given time, the data sender MUST NOT transmit new
        //      data to any destination transport address if its peer's
        //      rwnd indicates that the peer has no buffer space.
        //      However, regardless of the value of rwnd, the data sender
        //      can always have one DATA chunk in flight.
        if datasize > rwnd && inflight > 0 {
            return DataFit::RwndFull;
        }

        //   B) At any given time, the sender MUST NOT transmit new data
        //      to a given transport address if it has cwnd or more bytes
        //      of data outstanding to that transport address.
        // A chunk marked for fast retransmission ignores cwnd for this
        // one packet (RFC 4960 sec 7.2.4).
        if chunk.fast_retransmit != FastRetransmit::Needed && flight_size >= transport.cwnd {
            return DataFit::RwndFull;
        }

        // Nagle: only hold back a lone small chunk on an established
        // association that already has data in flight.
        if assoc.nodelay {
            return DataFit::Ok;
        }
        if !self.chunks.is_empty() {
            return DataFit::Ok;
        }
        if inflight == 0 {
            return DataFit::Ok;
        }
        if assoc.state != AssociationState::Established {
            return DataFit::Ok;
        }

        // Enough queued to fill a packet goes out now; an urgent message
        // goes out now; everything else waits for more data or a SACK.
        let room = (assoc.pathmtu as usize)
            .saturating_sub(self.overhead + DATA_CHUNK_HEADER_SIZE + PAYLOAD_PAD_RESERVE);
        if chunk.serialized_len() + assoc.out_qlen as usize > room {
            return DataFit::Ok;
        }
        if !chunk.can_delay {
            return DataFit::Ok;
        }

        DataFit::Delay
    }

    /// Window accounting and sequence assignment for an admitted DATA
    /// chunk.
    fn account_data(assoc: &mut Association, transport: &mut Transport, chunk: &mut ChunkPayloadData) {
        let datasize = chunk.data_size() as u32;

        transport.flight_size += datasize;
        assoc.outstanding_bytes += datasize;
        assoc.peer.rwnd = assoc.peer.rwnd.saturating_sub(datasize);

        // Without the partial-reliability extension the message must be
        // delivered; it can no longer be abandoned.
        if !assoc.peer.prsctp_capable {
            chunk.can_abandon = false;
        }

        if !chunk.has_tsn {
            chunk.tsn = assoc.next_tsn();
            chunk.has_tsn = true;
            assoc.assign_ssn(chunk);
        }

        log::trace!(
            "[{}] queued DATA: tsn={} len={} flight={} outstanding={} rwnd={}",
            assoc.name,
            chunk.tsn,
            datasize,
            transport.flight_size,
            assoc.outstanding_bytes,
            assoc.peer.rwnd
        );
    }

    /// Appends without bundling or data-window checks; the last gate is
    /// [`Packet::will_fit`].
    fn append_raw(
        &mut self,
        mut assoc: Option<&mut Association>,
        transport: &mut Transport,
        mut chunk: OutboundChunk,
    ) -> Verdict {
        // A SACK or AUTH never trails DATA; flushing first keeps the
        // bundling order RFC 4960 sec 6.10 requires.
        if self.has_data && matches!(chunk.chunk_type(), CT_SACK | CT_AUTH) {
            return Verdict::PmtuFull(chunk);
        }

        if chunk.is_data() && assoc.is_none() {
            log::error!("DATA chunk offered without an association");
            return Verdict::RwndFull(chunk);
        }

        if self.will_fit(assoc.as_deref(), transport, &chunk) == Fit::PmtuFull {
            return Verdict::PmtuFull(chunk);
        }

        match &mut chunk {
            OutboundChunk::Data(data) => {
                if let Some(a) = assoc.as_deref_mut() {
                    Packet::account_data(a, transport, data);
                }
                data.sent_at = Some(Instant::now());
                data.nsent += 1;
                data.transport = Some(self.transport);
                self.has_sack = true;
                self.has_auth = true;
                self.has_data = true;
            }
            OutboundChunk::CookieEcho(_) => {
                self.has_cookie_echo = true;
            }
            OutboundChunk::Sack(_) => {
                self.has_sack = true;
                if let Some(a) = assoc.as_deref_mut() {
                    a.stats.inc_sacks_out();
                }
            }
            OutboundChunk::Auth(_) => {
                self.has_auth = true;
                self.auth_index = Some(self.chunks.len());
            }
            OutboundChunk::Control(_) => {}
        }

        self.size += chunk.padded_len();
        self.chunks.push_back(chunk);

        Verdict::Ok
    }

    /// Opportunistically opens the packet with an AUTH chunk when the one
    /// being appended is of a type the peer wants authenticated.
    fn bundle_auth(
        &mut self,
        assoc: Option<&mut Association>,
        transport: &mut Transport,
        chunk: &OutboundChunk,
    ) {
        let Some(assoc) = assoc else {
            return;
        };
        if matches!(chunk, OutboundChunk::Auth(_)) || self.has_auth {
            return;
        }
        if !assoc.peer_requests_auth(chunk.chunk_type()) {
            return;
        }
        let Some(auth) = assoc.make_auth() else {
            return;
        };

        // A refused AUTH chunk is simply dropped; the triggering chunk is
        // then judged on its own.
        let _ = self.append_raw(Some(assoc), transport, OutboundChunk::Auth(auth));
    }

    /// Piggybacks a pending SACK in front of outgoing DATA when the
    /// delayed-ack timer is still running and this transport's view of the
    /// SACK state is current.
    fn bundle_sack(
        &mut self,
        assoc: Option<&mut Association>,
        transport: &mut Transport,
        chunk: &OutboundChunk,
    ) {
        if !chunk.is_data() || self.has_sack || self.has_cookie_echo {
            return;
        }
        let Some(assoc) = assoc else {
            return;
        };
        if !assoc.sack_timer_armed || transport.sack_generation != assoc.peer.sack_generation {
            return;
        }

        let sack = assoc.make_sack();
        if self
            .append_raw(Some(assoc), transport, OutboundChunk::Sack(sack))
            .is_ok()
        {
            assoc.peer.sack_needed = false;
            assoc.sack_timer_armed = false;
            log::trace!("[{}] bundled SACK with outgoing DATA", assoc.name);
        }
    }

    /// Offers one chunk for admission: data-window checks for DATA, then
    /// companion bundling, then the raw append.
    pub fn append_chunk(
        &mut self,
        mut assoc: Option<&mut Association>,
        transport: &mut Transport,
        chunk: OutboundChunk,
    ) -> Verdict {
        let chunk = match chunk {
            OutboundChunk::Data(data) => {
                if let Some(a) = assoc.as_deref() {
                    match self.can_append_data(a, transport, &data) {
                        DataFit::RwndFull => return Verdict::RwndFull(OutboundChunk::Data(data)),
                        DataFit::Delay => return Verdict::Delay(OutboundChunk::Data(data)),
                        DataFit::Ok => {}
                    }
                }
                OutboundChunk::Data(data)
            }
            other => other,
        };

        self.bundle_auth(assoc.as_deref_mut(), transport, &chunk);
        self.bundle_sack(assoc.as_deref_mut(), transport, &chunk);
        self.append_raw(assoc, transport, chunk)
    }

    /// One-shot entry for the outbound queue: append, and on a full packet
    /// flush and retry once.
    ///
    /// A packet carrying a COOKIE ECHO is never flushed here; the
    /// handshake bounds its own bundling. Serializer failures are parked
    /// in the socket error slot, never surfaced as a verdict. DATA chunks
    /// drained by the flush land in `sent`, which the caller files into
    /// the retransmission queue.
    pub fn transmit_chunk(
        &mut self,
        mut assoc: Option<&mut Association>,
        transport: &mut Transport,
        net: &mut dyn NetworkLayer,
        chunk: OutboundChunk,
        one_packet: bool,
        sent: &mut Vec<ChunkPayloadData>,
    ) -> Verdict {
        let verdict = self.append_chunk(assoc.as_deref_mut(), transport, chunk);
        match verdict {
            Verdict::PmtuFull(chunk) if !self.has_cookie_echo => {
                if let Err(err) = self.transmit(assoc.as_deref_mut(), transport, net, sent) {
                    log::warn!("flush before retry failed: {err}");
                    if let Some(a) = assoc.as_deref_mut() {
                        a.socket.err = Some(err);
                    }
                }
                if one_packet {
                    Verdict::PmtuFull(chunk)
                } else {
                    self.append_chunk(assoc, transport, chunk)
                }
            }
            other => other,
        }
    }

    /// Drops every remaining control chunk, hands DATA back to the
    /// retransmission queue, and returns the accumulator to its pristine
    /// state.
    pub(crate) fn drain_reset(&mut self, sent: &mut Vec<ChunkPayloadData>) {
        for chunk in self.chunks.drain(..) {
            if let OutboundChunk::Data(data) = chunk {
                sent.push(data);
            }
        }
        self.size = self.overhead;
        self.has_cookie_echo = false;
        self.has_sack = false;
        self.has_data = false;
        self.has_auth = false;
        self.ipfragok = false;
        self.auth_index = None;
    }
}
