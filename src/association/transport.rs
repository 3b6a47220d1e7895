/// Opaque identity of a peer transport address within its association.
///
/// The packetizer never dereferences it; it only stamps chunks and the
/// `last_sent_to` slot so the surrounding machinery can correlate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TransportId(pub u32);

/// Address family of a transport; decides the network-header room the
/// packetizer reserves in front of the SCTP common header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub fn net_header_len(self) -> usize {
        match self {
            AddressFamily::Ipv4 => 20,
            AddressFamily::Ipv6 => 40,
        }
    }
}

/// Offload capabilities of the device behind a route. Populated by the
/// network layer when it resolves the route; platforms differ by handing
/// back different features, not by patching the serializer.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DeviceFeatures {
    /// Device computes the SCTP CRC32-C itself; the serializer leaves the
    /// checksum field cleared and reports its offset.
    pub sctp_checksum_offload: bool,
    /// Largest segmentation-offload super-packet the device accepts, when
    /// it can split an SCTP super-packet into PMTU-sized segments.
    pub gso_max_size: Option<u32>,
}

/// Cached routing decision for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub pmtu: u32,
    /// The routing table changed since this entry was resolved; the
    /// serializer re-resolves before building.
    pub stale: bool,
    pub features: DeviceFeatures,
}

/// Per-destination view the packetizer reads and updates. The enclosing
/// association owns one of these per peer address; all mutation happens
/// under the association lock held by the caller.
#[derive(Debug, Clone)]
pub struct Transport {
    pub id: TransportId,
    pub family: AddressFamily,
    pub pathmtu: u32,
    pub cwnd: u32,
    /// When non-zero, a temporary burst clamp that stands in for cwnd in
    /// the super-packet growth limit.
    pub burst_limited: u32,
    /// Bytes sent on this transport and not yet acknowledged.
    pub flight_size: u32,
    /// An RTT measurement is in progress on this transport.
    pub rto_pending: bool,
    /// Generation of the last SACK state this transport saw; compared with
    /// the association's generation before piggybacking a SACK.
    pub sack_generation: u32,
    pub dst: Option<Route>,
}

impl Transport {
    pub fn new(id: TransportId, family: AddressFamily) -> Self {
        Transport {
            id,
            family,
            pathmtu: super::INITIAL_MTU,
            cwnd: 0,
            burst_limited: 0,
            flight_size: 0,
            rto_pending: false,
            sack_generation: 0,
            dst: None,
        }
    }

    /// Cap for one accumulated packet: the device's GSO limit when the
    /// route offers one, the path MTU otherwise.
    pub fn max_packet_size(&self) -> u32 {
        match self.dst.as_ref().and_then(|r| r.features.gso_max_size) {
            Some(gso_max) => gso_max,
            None => self.pathmtu,
        }
    }
}
