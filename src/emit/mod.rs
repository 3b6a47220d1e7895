
use std::io;
use std::sync::Once;

use bytes::{BufMut, Bytes, BytesMut};

use crate::association::transport::{Route, Transport};
use crate::association::Association;
use crate::chunk::chunk_auth::{ChunkAuth, AUTH_MAC_OFFSET};
use crate::chunk::chunk_payload_data::ChunkPayloadData;
use crate::chunk::OutboundChunk;
use crate::error::{Error, Result};
use crate::packet::{Packet, COMMON_HEADER_SIZE};
use crate::util::{generate_packet_checksum, get_padding_size, PADDING_MULTIPLE};

/// Byte offset of the checksum field within an SCTP packet.
pub const CHECKSUM_OFFSET: usize = 8;

/// Sentinel segment size telling the device to split at the recorded
/// segment boundaries rather than a fixed size.
pub const GSO_BY_FRAGS: u16 = u16::MAX;

/// How the checksum of an emitted packet is to be finished.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Checksum {
    /// CRC32-C already computed and written.
    Complete,
    /// Left cleared at `offset` within each segment; the device (or the
    /// segmentation fallback) fills it in.
    Offloaded { offset: usize },
}

/// Segmentation-offload summary of a super-packet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GsoInfo {
    pub segs: u16,
    pub gso_size: u16,
}

/// One emitted datagram, handed to the network layer.
///
/// `segments[0]` is the head; with segmentation offload every element is a
/// self-contained SCTP packet (own common header) and the device sends one
/// datagram per segment. Without offload there is exactly one segment.
#[derive(Debug)]
pub struct WirePacket {
    pub segments: Vec<Bytes>,
    pub checksum: Checksum,
    pub gso: Option<GsoInfo>,
    /// The network layer may IP-fragment this datagram.
    pub ipfragok: bool,
    /// Mark the datagram ECT-capable when building the IP header.
    pub ecn_capable: bool,
    /// Write-memory pinned on the originating socket until the downstream
    /// owner calls [`crate::association::Socket::uncharge`].
    pub charge: usize,
}

impl WirePacket {
    pub fn total_len(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }
}

/// The routing and transmit primitives the serializer hands off to.
///
/// Implementations own platform specifics: route lookup, device feature
/// discovery (checksum offload, GSO caps) and the address-family send.
pub trait NetworkLayer {
    /// Resolve the route for a transport; `None` means unreachable.
    fn route(&mut self, transport: &Transport) -> Option<Route>;

    /// Queue a built packet for transmission. The result is logged and
    /// otherwise ignored: a transport-level send failure never tears down
    /// the association from inside the packetizer.
    fn transmit(&mut self, packet: WirePacket, transport: &Transport) -> io::Result<()>;
}

static GSO_UNSUPPORTED_ONCE: Once = Once::new();

impl Packet {
    /// Serializes the accumulated chunk list into one datagram (or one
    /// GSO super-packet), hands it to the network layer, and resets the
    /// accumulator.
    ///
    /// DATA chunks end up in `sent` whether or not the hand-off succeeded;
    /// from here on the retransmission machinery owns their fate. Control
    /// chunks are consumed. An empty packet emits nothing and succeeds.
    pub fn transmit(
        &mut self,
        mut assoc: Option<&mut Association>,
        transport: &mut Transport,
        net: &mut dyn NetworkLayer,
        sent: &mut Vec<ChunkPayloadData>,
    ) -> Result<()> {
        if self.chunks.is_empty() {
            return Ok(());
        }

        let res = self.build_and_send(assoc.as_deref_mut(), transport, net, sent);
        self.drain_reset(sent);
        res
    }

    fn build_and_send(
        &mut self,
        mut assoc: Option<&mut Association>,
        transport: &mut Transport,
        net: &mut dyn NetworkLayer,
        sent: &mut Vec<ChunkPayloadData>,
    ) -> Result<()> {
        // Re-resolve a stale or missing route before committing any bytes.
        if transport.dst.as_ref().map_or(true, |r| r.stale) {
            transport.dst = net.route(transport);
        }
        let route = match transport.dst.clone() {
            Some(route) => route,
            None => {
                if let Some(a) = assoc.as_deref_mut() {
                    a.stats.inc_out_no_routes();
                    log::warn!("[{}] no route for outbound packet", a.name);
                }
                return Err(Error::ErrNoRoute);
            }
        };

        if assoc.as_deref().map_or(false, |a| a.pmtu_discovery) && route.pmtu != transport.pathmtu
        {
            log::debug!(
                "pathmtu resync: {} -> {} ",
                transport.pathmtu,
                route.pmtu
            );
            transport.pathmtu = route.pmtu;
            if let Some(a) = assoc.as_deref_mut() {
                a.pathmtu = route.pmtu;
            }
        }

        let pathmtu = transport.pathmtu as usize;
        let gso = self.size > pathmtu && !self.ipfragok;
        if gso && route.features.gso_max_size.is_none() {
            GSO_UNSUPPORTED_ONCE.call_once(|| {
                log::warn!("packet exceeds the path MTU and the route cannot segment; discarding");
            });
            return Err(Error::ErrGsoUnsupported);
        }

        let mut segments: Vec<Bytes> = Vec::new();
        let mut carried_auth: Option<ChunkAuth> = None;
        let mut any_data = false;

        while !self.chunks.is_empty() {
            // Decide which chunks ride in this segment. The AUTH chunk is
            // counted on its own because it repeats in every segment.
            let budget = if gso {
                pathmtu.saturating_sub(self.overhead)
            } else {
                usize::MAX
            };
            let mut take = 0usize;
            let mut payload = 0usize;
            let mut auth_len = 0usize;
            for chunk in self.chunks.iter() {
                let padded = chunk.padded_len();
                if matches!(chunk, OutboundChunk::Auth(_)) {
                    if payload + padded > budget {
                        return Err(Error::ErrAuthChunkTooBig);
                    }
                    auth_len = padded;
                    payload += padded;
                    take += 1;
                    continue;
                }
                if gso && auth_len + padded + self.overhead > pathmtu {
                    // Not even an empty segment could carry AUTH plus this
                    // chunk; the configuration is broken.
                    return Err(Error::ErrAuthChunkTooBig);
                }
                if payload + padded > budget {
                    break;
                }
                payload += padded;
                take += 1;
            }

            let mut buf = BytesMut::with_capacity(COMMON_HEADER_SIZE + payload);
            buf.put_u16(self.source_port);
            buf.put_u16(self.destination_port);
            buf.put_u32(self.vtag);
            let checksum_pos = buf.len();
            buf.put_u32(0);

            let mut auth_offset: Option<usize> = None;
            for _ in 0..take {
                let chunk = match self.chunks.pop_front() {
                    Some(chunk) => chunk,
                    None => break,
                };

                if matches!(chunk, OutboundChunk::Auth(_)) {
                    auth_offset = Some(buf.len());
                }
                chunk.marshal_to(&mut buf)?;
                let padding = get_padding_size(buf.len());
                if padding != 0 {
                    buf.extend_from_slice(&[0u8; PADDING_MULTIPLE][..padding]);
                }

                match chunk {
                    OutboundChunk::Data(mut data) => {
                        // One RTT sample per RTT per destination: arm on a
                        // first transmission when no probe is outstanding.
                        if !data.resent && !transport.rto_pending {
                            data.rtt_in_progress = true;
                            transport.rto_pending = true;
                        }
                        any_data = true;
                        sent.push(data);
                    }
                    OutboundChunk::Auth(auth) => {
                        carried_auth = Some(auth);
                    }
                    // Control chunks are consumed by serialization.
                    _ => {}
                }
            }

            // SCTP-AUTH sec 6.2: the MAC covers the AUTH chunk with a
            // cleared MAC field and every chunk bundled after it. The
            // field is still zero here; compute, then patch in place.
            if let Some(offset) = auth_offset {
                if let Some(ctx) = assoc.as_deref().and_then(|a| a.auth.as_ref()) {
                    let mac = ctx.calculate(&buf[offset..])?;
                    let mac_start = offset + AUTH_MAC_OFFSET;
                    buf[mac_start..mac_start + mac.len()].copy_from_slice(&mac);
                }
            }

            let offloaded = gso || route.features.sctp_checksum_offload;
            if !offloaded {
                let checksum = generate_packet_checksum(&buf);
                // CRC32-C comes out bit-reflected; storing little-endian
                // keeps the wire order right.
                buf[checksum_pos..checksum_pos + 4].copy_from_slice(&checksum.to_le_bytes());
            }

            segments.push(buf.freeze());

            if self.chunks.is_empty() {
                break;
            }
            // More segments follow: AUTH opens each of them.
            if let Some(auth) = &carried_auth {
                self.chunks.push_front(OutboundChunk::Auth(auth.clone()));
            }
        }

        let nsegs = segments.len();
        let charge = segments.iter().map(|s| s.len()).sum::<usize>()
            + nsegs * (self.overhead - COMMON_HEADER_SIZE);
        let wire = WirePacket {
            segments,
            checksum: if gso || route.features.sctp_checksum_offload {
                Checksum::Offloaded {
                    offset: CHECKSUM_OFFSET,
                }
            } else {
                Checksum::Complete
            },
            gso: if gso {
                Some(GsoInfo {
                    segs: nsegs as u16,
                    gso_size: GSO_BY_FRAGS,
                })
            } else {
                None
            },
            ipfragok: self.ipfragok,
            ecn_capable: self.ecn_capable,
            charge,
        };

        if let Some(a) = assoc.as_deref_mut() {
            // The socket stays pinned until the downstream owner releases
            // the charge.
            a.socket.charge(charge);
            a.stats.inc_out_packets();
            a.last_sent_to = Some(transport.id);
            if any_data {
                a.restart_autoclose();
            }
            log::debug!(
                "[{}] emitting {} segment(s), {} bytes",
                a.name,
                nsegs,
                wire.total_len()
            );
        }

        // Downstream send failures are path management's business, not
        // the packetizer's.
        if let Err(err) = net.transmit(wire, transport) {
            log::debug!("lower layer transmit failed: {err}");
        }

        Ok(())
    }
}
