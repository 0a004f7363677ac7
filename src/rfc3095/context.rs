use crate::encodings::{
    detect_ip_id_behaviour, ip_id_offset, IpIdBehaviour, TsScaled, WlsbWindow, P_IP_ID, P_SN,
};
use crate::packet::{IpSlice, ParsedPacket};

/// Number of repetitions after which a changed field value is trusted
/// to have reached the decompressor (the "optimistic approach").
pub(crate) const OA_REPETITIONS: u8 = 3;

/// Increments the stability counter when the observed value confirms
/// the stored one, stores and restarts it otherwise. Returns true
/// while the field still needs to be repeated.
fn refresh_counted<T: PartialEq + Copy>(stored: &mut T, count: &mut u8, observed: T) -> bool {
    if *stored == observed {
        if *count < OA_REPETITIONS {
            *count += 1;
        }
    } else {
        *stored = observed;
        *count = 1;
    }
    *count < OA_REPETITIONS
}

/// IPv4 specific part of a tracked IP header.
#[derive(Clone, Debug)]
pub(crate) struct Ipv4Info {
    pub source: [u8; 4],
    pub destination: [u8; 4],
    pub df: bool,
    pub df_count: u8,
    /// Identification field of the previous packet.
    pub last_id: u16,
    pub nbo: bool,
    pub rnd: bool,
    pub sid: bool,
    pub nbo_count: u8,
    pub rnd_count: u8,
    pub sid_count: u8,
    /// W-LSB window over transmitted `IP-ID - SN` offsets.
    pub id_window: WlsbWindow,
}

/// IPv6 specific part of a tracked IP header.
#[derive(Clone, Debug)]
pub(crate) struct Ipv6Info {
    pub source: [u8; 16],
    pub destination: [u8; 16],
    pub flow_label: u32,
}

#[derive(Clone, Debug)]
pub(crate) enum IpVersionInfo {
    V4(Ipv4Info),
    V6(Ipv6Info),
}

/// Per IP header compression state.
#[derive(Clone, Debug)]
pub(crate) struct IpHeaderInfo {
    pub tos: u8,
    pub ttl: u8,
    /// IPv4 protocol / IPv6 next header value (part of the static
    /// chain, tracked because it can change without opening a new
    /// flow).
    pub protocol: u8,
    pub tos_count: u8,
    pub ttl_count: u8,
    pub protocol_count: u8,
    pub version: IpVersionInfo,
}

impl IpHeaderInfo {
    pub(crate) fn new(ip: &IpSlice<'_>, wlsb_width: usize) -> IpHeaderInfo {
        let version = match ip {
            IpSlice::V4(v4) => IpVersionInfo::V4(Ipv4Info {
                source: v4.source(),
                destination: v4.destination(),
                df: v4.dont_fragment(),
                df_count: 1,
                last_id: v4.identification(),
                nbo: true,
                rnd: false,
                sid: false,
                nbo_count: 1,
                rnd_count: 1,
                sid_count: 1,
                id_window: WlsbWindow::new(16, wlsb_width, P_IP_ID),
            }),
            IpSlice::V6(v6) => IpVersionInfo::V6(Ipv6Info {
                source: v6.source(),
                destination: v6.destination(),
                flow_label: v6.flow_label(),
            }),
        };
        IpHeaderInfo {
            tos: ip.tos_or_traffic_class(),
            ttl: ip.ttl_or_hop_limit(),
            protocol: ip.transport_protocol(),
            tos_count: 1,
            ttl_count: 1,
            protocol_count: 1,
            version,
        }
    }

    pub(crate) fn is_v4(&self) -> bool {
        matches!(self.version, IpVersionInfo::V4(_))
    }

    pub(crate) fn v4(&self) -> Option<&Ipv4Info> {
        match &self.version {
            IpVersionInfo::V4(v4) => Some(v4),
            IpVersionInfo::V6(_) => None,
        }
    }

    pub(crate) fn v4_mut(&mut self) -> Option<&mut Ipv4Info> {
        match &mut self.version {
            IpVersionInfo::V4(v4) => Some(v4),
            IpVersionInfo::V6(_) => None,
        }
    }

    /// True when the addresses (and the IPv6 flow label) still match
    /// the tracked flow.
    pub(crate) fn same_flow(&self, ip: &IpSlice<'_>) -> bool {
        match (&self.version, ip) {
            (IpVersionInfo::V4(info), IpSlice::V4(v4)) => {
                info.source == v4.source() && info.destination == v4.destination()
            }
            (IpVersionInfo::V6(info), IpSlice::V6(v6)) => {
                info.source == v6.source()
                    && info.destination == v6.destination()
                    && info.flow_label == v6.flow_label()
            }
            _ => false,
        }
    }
}

/// UDP part of a context.
#[derive(Clone, Debug)]
pub(crate) struct UdpCtxt {
    pub source_port: u16,
    pub destination_port: u16,
    /// A non-zero checksum on the first packet pins the checksum as
    /// present for the flow; it is then carried in every packet.
    pub checksum_used: bool,
    pub checksum_behaviour_count: u8,
}

impl UdpCtxt {
    pub(crate) fn new(source_port: u16, destination_port: u16, checksum: u16) -> UdpCtxt {
        UdpCtxt {
            source_port,
            destination_port,
            checksum_used: checksum != 0,
            checksum_behaviour_count: 1,
        }
    }
}

/// UDP-Lite part of a context.
#[derive(Clone, Debug)]
pub(crate) struct UdpLiteCtxt {
    pub source_port: u16,
    pub destination_port: u16,
    /// Coverage equal to the datagram length can be inferred by the
    /// decompressor and is not transmitted.
    pub coverage_inferred: bool,
    pub coverage_count: u8,
}

/// RTP part of a context.
#[derive(Clone, Debug)]
pub(crate) struct RtpCtxt {
    pub udp: UdpCtxt,
    pub ssrc: u32,
    pub payload_type: u8,
    pub payload_type_count: u8,
    pub marker: bool,
    pub ts: TsScaled,
    /// The TS stride was announced in a dynamic chain, scaled TS bits
    /// may be sent.
    pub stride_announced: bool,
}

/// Transport layer part of a generic context.
#[derive(Clone, Debug)]
pub(crate) enum TransportCtxt {
    Ip,
    Udp(UdpCtxt),
    UdpLite(UdpLiteCtxt),
    Rtp(RtpCtxt),
}

impl TransportCtxt {
    pub(crate) fn is_rtp(&self) -> bool {
        matches!(self, TransportCtxt::Rtp(_))
    }

    pub(crate) fn rtp(&self) -> Option<&RtpCtxt> {
        match self {
            TransportCtxt::Rtp(rtp) => Some(rtp),
            _ => None,
        }
    }

    pub(crate) fn rtp_mut(&mut self) -> Option<&mut RtpCtxt> {
        match self {
            TransportCtxt::Rtp(rtp) => Some(rtp),
            _ => None,
        }
    }
}

/// Summary of what changed in the packet currently being compressed,
/// recomputed by [`Rfc3095Ctxt::observe`] for every packet.
#[derive(Clone, Debug, Default)]
pub(crate) struct ChangeSummary {
    /// Static chain fields (the protocol byte) still needing
    /// repetitions.
    pub send_static: u8,
    /// Dynamic fields (TOS, TTL, DF, IP-ID behaviour flags, UDP
    /// checksum behaviour, RTP PT) still needing repetitions.
    pub send_dynamic: u8,
    /// An IP-ID behaviour flag flipped in this very packet; the
    /// dynamic chain must be resent.
    pub flag_flipped: bool,
    /// Bits needed to transmit the new SN under W-LSB.
    pub sn_bits: u8,
    /// Bits needed for the outer IP-ID offset (0 when none are
    /// needed, also for static and random IDs).
    pub outer_id_bits: u8,
    /// Offset value for the outer IP-ID.
    pub outer_id_offset: u16,
    /// Bits needed for the inner IP-ID offset.
    pub inner_id_bits: u8,
    /// Scaled TS bits for the RTP profile (32 while the stride is not
    /// usable).
    pub ts_bits: u8,
    /// The decompressor can infer the TS from the SN jump.
    pub ts_deducible: bool,
    /// Marker bit of the packet (RTP).
    pub marker: bool,
    /// The marker differs from the previous packet (RTP).
    pub marker_changed: bool,
}

/// Generic compression context of the RFC 3095 family of profiles.
#[derive(Clone, Debug)]
pub(crate) struct Rfc3095Ctxt {
    /// The master sequence number: the internal counter for IP-only,
    /// UDP and UDP-Lite flows, the RTP sequence number for RTP flows.
    pub sn: u16,
    pub sn_window: WlsbWindow,
    pub outer_ip: IpHeaderInfo,
    pub inner_ip: Option<IpHeaderInfo>,
    /// Packets sent in IR state.
    pub ir_count: u32,
    /// Packets sent in FO state.
    pub fo_count: u32,
    /// Packets sent in SO state.
    pub so_count: u32,
    /// Packets since the last periodic IR refresh fired.
    pub refresh_ir_count: u32,
    /// Packets since the last periodic FO refresh fired.
    pub refresh_fo_count: u32,
    pub transport: TransportCtxt,
    pub tmp: ChangeSummary,
}

impl Rfc3095Ctxt {
    pub(crate) fn new(
        pkt: &ParsedPacket<'_>,
        transport: TransportCtxt,
        initial_sn: u16,
        wlsb_width: usize,
    ) -> Rfc3095Ctxt {
        Rfc3095Ctxt {
            sn: initial_sn,
            sn_window: WlsbWindow::new(16, wlsb_width, P_SN),
            outer_ip: IpHeaderInfo::new(pkt.outer(), wlsb_width),
            inner_ip: pkt.inner().map(|ip| IpHeaderInfo::new(ip, wlsb_width)),
            ir_count: 0,
            fo_count: 0,
            so_count: 0,
            refresh_ir_count: 0,
            refresh_fo_count: 0,
            transport,
            tmp: ChangeSummary::default(),
        }
    }

    pub(crate) fn ip_hdr_count(&self) -> usize {
        if self.inner_ip.is_some() {
            2
        } else {
            1
        }
    }

    /// The SN the packet being compressed will carry.
    pub(crate) fn next_sn(&self, pkt: &ParsedPacket<'_>) -> u16 {
        match &self.transport {
            TransportCtxt::Rtp(_) => {
                // the RTP SN is taken from the packet itself
                let off = pkt.transport_offset() + 8;
                let data = pkt.data();
                if data.len() >= off + 4 {
                    u16::from_be_bytes([data[off + 2], data[off + 3]])
                } else {
                    self.sn
                }
            }
            _ => self.sn.wrapping_add(1),
        }
    }

    /// Runs the change detection over the packet and fills `tmp`.
    ///
    /// Counters follow the optimistic approach: a changed field is
    /// repeated until [`OA_REPETITIONS`] consecutive packets carried
    /// the new value.
    pub(crate) fn observe(&mut self, pkt: &ParsedPacket<'_>, next_sn: u16) {
        let mut tmp = ChangeSummary {
            sn_bits: self.sn_window.k_for(u32::from(next_sn)),
            ..ChangeSummary::default()
        };

        let outer = observe_ip_header(&mut self.outer_ip, pkt.outer(), next_sn);
        tmp.send_static += outer.static_unstable;
        tmp.send_dynamic += outer.dynamic_unstable;
        tmp.flag_flipped |= outer.flag_flipped;
        tmp.outer_id_bits = outer.id_bits;
        tmp.outer_id_offset = outer.id_offset;

        if let (Some(info), Some(ip)) = (self.inner_ip.as_mut(), pkt.inner()) {
            let inner = observe_ip_header(info, ip, next_sn);
            tmp.send_static += inner.static_unstable;
            tmp.send_dynamic += inner.dynamic_unstable;
            tmp.flag_flipped |= inner.flag_flipped;
            tmp.inner_id_bits = inner.id_bits;
        }

        let old_sn = self.sn;
        match &mut self.transport {
            TransportCtxt::Ip => {}
            TransportCtxt::Udp(udp) => {
                if let Ok(slice) = pkt.udp() {
                    let present = slice.checksum() != 0;
                    if refresh_counted(
                        &mut udp.checksum_used,
                        &mut udp.checksum_behaviour_count,
                        present,
                    ) {
                        tmp.send_dynamic += 1;
                    }
                }
            }
            TransportCtxt::UdpLite(lite) => {
                if let Ok(slice) = pkt.udp() {
                    let datagram_len = pkt.total_len() - pkt.transport_offset();
                    let inferred = usize::from(slice.checksum_coverage()) == datagram_len;
                    if refresh_counted(&mut lite.coverage_inferred, &mut lite.coverage_count, inferred)
                    {
                        tmp.send_dynamic += 1;
                    }
                }
            }
            TransportCtxt::Rtp(rtp) => {
                let rtp_off = pkt.transport_offset() + 8;
                let data = pkt.data();
                if data.len() >= rtp_off + 12 {
                    let marker = data[rtp_off + 1] & 0x80 != 0;
                    tmp.marker = marker;
                    tmp.marker_changed = marker != rtp.marker;

                    let pt = data[rtp_off + 1] & 0x7f;
                    if refresh_counted(&mut rtp.payload_type, &mut rtp.payload_type_count, pt) {
                        tmp.send_dynamic += 1;
                    }

                    let ts = u32::from_be_bytes([
                        data[rtp_off + 4],
                        data[rtp_off + 5],
                        data[rtp_off + 6],
                        data[rtp_off + 7],
                    ]);
                    let ts_delta = ts.wrapping_sub(rtp.ts.last_ts());
                    let prev_scaled = rtp.ts.scaled();
                    let was_scaled = rtp.ts.is_scaled();
                    rtp.ts.observe(ts);
                    if !rtp.ts.is_scaled() {
                        // scaled encoding lost its stride, it has to be
                        // re-announced in a dynamic chain
                        rtp.stride_announced = false;
                    }
                    let sn_delta = next_sn.wrapping_sub(old_sn);
                    tmp.ts_deducible = ts_delta == 0
                        || (was_scaled
                            && rtp.ts.is_scaled()
                            && rtp.stride_announced
                            && u32::from(sn_delta)
                                == rtp.ts.scaled().wrapping_sub(prev_scaled));
                    tmp.ts_bits = if tmp.ts_deducible {
                        0
                    } else if rtp.ts.is_scaled() && rtp.stride_announced {
                        rtp.ts.scaled_bits()
                    } else {
                        32
                    };

                    // a UDP checksum toggle is a dynamic change as well
                    let present = {
                        let off = pkt.transport_offset();
                        u16::from_be_bytes([data[off + 6], data[off + 7]]) != 0
                    };
                    if refresh_counted(
                        &mut rtp.udp.checksum_used,
                        &mut rtp.udp.checksum_behaviour_count,
                        present,
                    ) {
                        tmp.send_dynamic += 1;
                    }
                }
            }
        }

        self.tmp = tmp;
    }

    /// Records everything the emitted packet established: the new SN,
    /// W-LSB references, IP-ID snapshots and the scaled TS reference.
    pub(crate) fn commit_packet(&mut self, pkt: &ParsedPacket<'_>, sn: u16, dynamic_sent: bool) {
        self.sn = sn;
        self.sn_window.add(sn, u32::from(sn));

        commit_ip_header(&mut self.outer_ip, pkt.outer(), sn);
        if let (Some(info), Some(ip)) = (self.inner_ip.as_mut(), pkt.inner()) {
            commit_ip_header(info, ip, sn);
        }

        if let TransportCtxt::Rtp(rtp) = &mut self.transport {
            rtp.marker = self.tmp.marker;
            rtp.ts.commit(sn);
            if dynamic_sent && rtp.ts.is_scaled() {
                rtp.stride_announced = true;
            }
        }
    }
}

/// What [`observe_ip_header`] found out about one IP header.
#[derive(Clone, Copy, Debug, Default)]
struct IpHeaderChanges {
    static_unstable: u8,
    dynamic_unstable: u8,
    flag_flipped: bool,
    id_bits: u8,
    id_offset: u16,
}

fn observe_ip_header(
    info: &mut IpHeaderInfo,
    ip: &IpSlice<'_>,
    next_sn: u16,
) -> IpHeaderChanges {
    let mut changes = IpHeaderChanges::default();

    if refresh_counted(&mut info.tos, &mut info.tos_count, ip.tos_or_traffic_class()) {
        changes.dynamic_unstable += 1;
    }
    if refresh_counted(&mut info.ttl, &mut info.ttl_count, ip.ttl_or_hop_limit()) {
        changes.dynamic_unstable += 1;
    }
    if refresh_counted(
        &mut info.protocol,
        &mut info.protocol_count,
        ip.transport_protocol(),
    ) {
        changes.static_unstable += 1;
    }

    if let (IpVersionInfo::V4(v4), IpSlice::V4(hdr)) = (&mut info.version, ip) {
        if refresh_counted(&mut v4.df, &mut v4.df_count, hdr.dont_fragment()) {
            changes.dynamic_unstable += 1;
        }

        let new_id = hdr.identification();
        let IpIdBehaviour { nbo, rnd, sid } = detect_ip_id_behaviour(v4.last_id, new_id);
        changes.flag_flipped =
            (!sid && nbo != v4.nbo) || rnd != v4.rnd || sid != v4.sid;
        if refresh_counted(&mut v4.rnd, &mut v4.rnd_count, rnd) {
            changes.dynamic_unstable += 1;
        }
        if refresh_counted(&mut v4.sid, &mut v4.sid_count, sid) {
            changes.dynamic_unstable += 1;
        }
        // the byte order is unknowable while the value sits still
        if !sid && refresh_counted(&mut v4.nbo, &mut v4.nbo_count, nbo) {
            changes.dynamic_unstable += 1;
        }

        if v4.rnd || v4.sid {
            changes.id_bits = 0;
        } else {
            changes.id_offset = ip_id_offset(new_id, v4.nbo, next_sn);
            changes.id_bits = v4.id_window.k_for(u32::from(changes.id_offset));
        }
    }

    changes
}

fn commit_ip_header(info: &mut IpHeaderInfo, ip: &IpSlice<'_>, sn: u16) {
    if let (IpVersionInfo::V4(v4), IpSlice::V4(hdr)) = (&mut info.version, ip) {
        v4.last_id = hdr.identification();
        if !v4.rnd && !v4.sid {
            let offset = ip_id_offset(v4.last_id, v4.nbo, sn);
            v4.id_window.add(sn, u32::from(offset));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::packet::ParsedPacket;

    fn ipv4_udp_packet(id: u16, payload_len: usize) -> Vec<u8> {
        let total = 28 + payload_len;
        let mut bytes = vec![
            0x45,
            0x00,
            (total >> 8) as u8,
            total as u8,
            (id >> 8) as u8,
            id as u8,
            0x40,
            0x00,
            0x40,
            17,
            0x00,
            0x00,
            10,
            0,
            0,
            1,
            10,
            0,
            0,
            2,
        ];
        let udp_len = 8 + payload_len;
        bytes.extend([
            0x13,
            0x8c,
            0x13,
            0x8c,
            (udp_len >> 8) as u8,
            udp_len as u8,
            0,
            0,
        ]);
        bytes.extend(core::iter::repeat(0).take(payload_len));
        bytes
    }

    fn fresh_ctxt(bytes: &[u8]) -> Rfc3095Ctxt {
        let pkt = ParsedPacket::from_slice(bytes).unwrap();
        Rfc3095Ctxt::new(&pkt, TransportCtxt::Ip, 100, 4)
    }

    #[test]
    fn stable_fields_saturate() {
        let bytes = ipv4_udp_packet(50, 0);
        let mut ctxt = fresh_ctxt(&bytes);
        for i in 0..3 {
            let pkt = ParsedPacket::from_slice(&bytes).unwrap();
            let sn = ctxt.next_sn(&pkt);
            ctxt.observe(&pkt, sn);
            ctxt.commit_packet(&pkt, sn, true);
            let _ = i;
        }
        // identical packets settle every counter: the ID is static
        assert_eq!(0, ctxt.tmp.send_static);
        assert_eq!(0, ctxt.tmp.send_dynamic);
        assert_eq!(0, ctxt.tmp.outer_id_bits);
    }

    #[test]
    fn random_ip_id_flips_flag() {
        let mut ctxt = fresh_ctxt(&ipv4_udp_packet(50, 0));
        // a couple of sequential IDs first
        for id in [51u16, 52, 53] {
            let bytes = ipv4_udp_packet(id, 0);
            let pkt = ParsedPacket::from_slice(&bytes).unwrap();
            let sn = ctxt.next_sn(&pkt);
            ctxt.observe(&pkt, sn);
            ctxt.commit_packet(&pkt, sn, false);
        }
        assert!(!ctxt.outer_ip.v4().unwrap().rnd);

        // then a random jump
        let bytes = ipv4_udp_packet(0x9b1d, 0);
        let pkt = ParsedPacket::from_slice(&bytes).unwrap();
        let sn = ctxt.next_sn(&pkt);
        ctxt.observe(&pkt, sn);
        assert!(ctxt.tmp.flag_flipped);
        assert!(ctxt.outer_ip.v4().unwrap().rnd);
        assert_eq!(0, ctxt.tmp.outer_id_bits);
    }

    #[test]
    fn sequential_ip_id_needs_no_bits_once_settled() {
        let mut ctxt = fresh_ctxt(&ipv4_udp_packet(50, 0));
        let mut last_bits = 16;
        for id in [51u16, 52, 53, 54] {
            let bytes = ipv4_udp_packet(id, 0);
            let pkt = ParsedPacket::from_slice(&bytes).unwrap();
            let sn = ctxt.next_sn(&pkt);
            ctxt.observe(&pkt, sn);
            ctxt.commit_packet(&pkt, sn, false);
            last_bits = ctxt.tmp.outer_id_bits;
        }
        // the offset IP-ID is constant, no bits are required
        assert_eq!(0, last_bits);
    }
}
