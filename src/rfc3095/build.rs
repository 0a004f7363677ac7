//! Builders for the ROHC packet formats of the RFC 3095 family
//! profiles (IR, IR-DYN, UO-0, the UO-1 and UOR-2 families and their
//! extensions).

use super::context::{Rfc3095Ctxt, TransportCtxt, OA_REPETITIONS};
use super::decide::{Extension, PacketDecision};
use crate::crc::CrcTables;
use crate::encodings::sdvl_encode;
use crate::err::Layer;
use crate::packet::{IpSlice, ParsedPacket, RtpSlice, UdpSlice};
use crate::{CidType, OperatingMode, ProfileId, RohcPacketType};

/// Upper bound for a compressed header (two IPv6 chains, UDP and RTP
/// parts plus CID bytes stay well below this).
pub(crate) const MAX_HEADER_LEN: usize = 256;

/// Error when a compressed header does not fit the scratch buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct EncodeOutOfSpace;

/// Bounds checked byte writer for compressed headers.
pub(crate) struct PacketWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> PacketWriter<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> PacketWriter<'a> {
        PacketWriter { buf, pos: 0 }
    }

    pub(crate) fn push(&mut self, value: u8) -> Result<(), EncodeOutOfSpace> {
        if self.pos >= self.buf.len() {
            return Err(EncodeOutOfSpace);
        }
        self.buf[self.pos] = value;
        self.pos += 1;
        Ok(())
    }

    pub(crate) fn push_slice(&mut self, values: &[u8]) -> Result<(), EncodeOutOfSpace> {
        if self.pos + values.len() > self.buf.len() {
            return Err(EncodeOutOfSpace);
        }
        self.buf[self.pos..self.pos + values.len()].copy_from_slice(values);
        self.pos += values.len();
        Ok(())
    }

    pub(crate) fn push_u16(&mut self, value: u16) -> Result<(), EncodeOutOfSpace> {
        self.push_slice(&value.to_be_bytes())
    }

    pub(crate) fn push_u32(&mut self, value: u32) -> Result<(), EncodeOutOfSpace> {
        self.push_slice(&value.to_be_bytes())
    }

    pub(crate) fn push_sdvl(&mut self, value: u32) -> Result<(), EncodeOutOfSpace> {
        let written = sdvl_encode(value, &mut self.buf[self.pos..])
            .map_err(|_| EncodeOutOfSpace)?;
        self.pos += written;
        Ok(())
    }

    pub(crate) fn patch(&mut self, index: usize, value: u8) {
        self.buf[index] = value;
    }

    pub(crate) fn len(&self) -> usize {
        self.pos
    }

    pub(crate) fn written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }
}

/// Channel and CRC inputs shared by all builders.
pub(crate) struct BuildEnv<'a> {
    pub cid_type: CidType,
    pub cid: u16,
    pub crc: &'a CrcTables,
    pub profile: ProfileId,
    pub mode: OperatingMode,
    /// Uncompressed header bytes the small CRCs cover.
    pub uncomp_header: &'a [u8],
}

impl BuildEnv<'_> {
    /// Writes the add-CID octet for small non-zero CIDs.
    fn push_add_cid(&self, w: &mut PacketWriter<'_>) -> Result<(), EncodeOutOfSpace> {
        if self.cid_type == CidType::Small && self.cid != 0 {
            w.push(0xe0 | (self.cid as u8 & 0x0f))?;
        }
        Ok(())
    }

    /// Writes the SDVL coded large CID (placed after the first packet
    /// octet).
    fn push_large_cid(&self, w: &mut PacketWriter<'_>) -> Result<(), EncodeOutOfSpace> {
        if self.cid_type == CidType::Large {
            w.push_sdvl(u32::from(self.cid))?;
        }
        Ok(())
    }
}

/// Builds the decided packet into `dest` and returns its length.
pub(crate) fn build_packet(
    ctxt: &Rfc3095Ctxt,
    pkt: &ParsedPacket<'_>,
    env: &BuildEnv<'_>,
    sn: u16,
    decision: &PacketDecision,
    dest: &mut [u8],
) -> Result<usize, EncodeOutOfSpace> {
    let mut w = PacketWriter::new(dest);
    match decision.packet_type {
        RohcPacketType::Ir => build_ir(ctxt, pkt, env, sn, &mut w)?,
        RohcPacketType::IrDyn => build_ir_dyn(ctxt, pkt, env, sn, &mut w)?,
        RohcPacketType::Uo0 => build_uo0(ctxt, pkt, env, sn, &mut w)?,
        RohcPacketType::Uo1 | RohcPacketType::Uo1Id | RohcPacketType::Uo1Ts => {
            build_uo1(ctxt, pkt, env, sn, decision.packet_type, &mut w)?
        }
        RohcPacketType::Uor2 | RohcPacketType::Uor2Id | RohcPacketType::Uor2Ts => {
            build_uor2(ctxt, pkt, env, sn, decision, &mut w)?
        }
        RohcPacketType::Normal => return Err(EncodeOutOfSpace),
    }
    Ok(w.len())
}

/// IR packet: `1111110D` type octet, profile, CRC-8 and both chains
/// (RFC 3095, §5.7.7.1).
fn build_ir(
    ctxt: &Rfc3095Ctxt,
    pkt: &ParsedPacket<'_>,
    env: &BuildEnv<'_>,
    sn: u16,
    w: &mut PacketWriter<'_>,
) -> Result<(), EncodeOutOfSpace> {
    env.push_add_cid(w)?;
    w.push(0xfd)?; // D = 1, the dynamic chain is always present
    env.push_large_cid(w)?;
    w.push(env.profile.wire_octet())?;
    let crc_idx = w.len();
    w.push(0)?;

    write_static_chain(ctxt, pkt, w)?;
    write_dynamic_chain(ctxt, pkt, sn, w)?;
    write_ir_remainder(ctxt, sn, w)?;

    let crc = env.crc.crc8(w.written());
    w.patch(crc_idx, crc);
    Ok(())
}

/// IR-DYN packet: `11111000` type octet, profile, CRC-8 and the
/// dynamic chain (RFC 3095, §5.7.7.2).
fn build_ir_dyn(
    ctxt: &Rfc3095Ctxt,
    pkt: &ParsedPacket<'_>,
    env: &BuildEnv<'_>,
    sn: u16,
    w: &mut PacketWriter<'_>,
) -> Result<(), EncodeOutOfSpace> {
    env.push_add_cid(w)?;
    w.push(0xf8)?;
    env.push_large_cid(w)?;
    w.push(env.profile.wire_octet())?;
    let crc_idx = w.len();
    w.push(0)?;

    write_dynamic_chain(ctxt, pkt, sn, w)?;
    write_ir_remainder(ctxt, sn, w)?;

    let crc = env.crc.crc8(w.written());
    w.patch(crc_idx, crc);
    Ok(())
}

/// UO-0: `0 SN(4) CRC(3)` (RFC 3095, §5.7.1).
fn build_uo0(
    ctxt: &Rfc3095Ctxt,
    pkt: &ParsedPacket<'_>,
    env: &BuildEnv<'_>,
    sn: u16,
    w: &mut PacketWriter<'_>,
) -> Result<(), EncodeOutOfSpace> {
    env.push_add_cid(w)?;
    let crc = env.crc.crc3(env.uncomp_header);
    w.push(((sn as u8 & 0x0f) << 3) | (crc & 0x07))?;
    env.push_large_cid(w)?;
    write_irregular_tail(ctxt, pkt, w)
}

/// The UO-1 family (RFC 3095, §5.7.3). The plain variant carries 6
/// IP-ID bits, the RTP variants split on the T bit.
fn build_uo1(
    ctxt: &Rfc3095Ctxt,
    pkt: &ParsedPacket<'_>,
    env: &BuildEnv<'_>,
    sn: u16,
    packet_type: RohcPacketType,
    w: &mut PacketWriter<'_>,
) -> Result<(), EncodeOutOfSpace> {
    env.push_add_cid(w)?;
    let crc = env.crc.crc3(env.uncomp_header) & 0x07;
    let tmp = &ctxt.tmp;
    match packet_type {
        RohcPacketType::Uo1 => {
            w.push(0x80 | (tmp.outer_id_offset as u8 & 0x3f))?;
            env.push_large_cid(w)?;
            w.push(((sn as u8 & 0x1f) << 3) | crc)?;
        }
        RohcPacketType::Uo1Id => {
            w.push(0x80 | (tmp.outer_id_offset as u8 & 0x1f))?;
            env.push_large_cid(w)?;
            // X = 0, no extension
            w.push(((sn as u8 & 0x0f) << 3) | crc)?;
        }
        RohcPacketType::Uo1Ts => {
            let scaled = ctxt
                .transport
                .rtp()
                .map(|rtp| rtp.ts.scaled())
                .unwrap_or(0);
            w.push(0xa0 | (scaled as u8 & 0x1f))?;
            env.push_large_cid(w)?;
            let m = u8::from(tmp.marker) << 7;
            w.push(m | ((sn as u8 & 0x0f) << 3) | crc)?;
        }
        _ => return Err(EncodeOutOfSpace),
    }
    write_irregular_tail(ctxt, pkt, w)
}

/// The UOR-2 family with its extensions (RFC 3095, §5.7.4 / §5.7.5).
fn build_uor2(
    ctxt: &Rfc3095Ctxt,
    pkt: &ParsedPacket<'_>,
    env: &BuildEnv<'_>,
    sn: u16,
    decision: &PacketDecision,
    w: &mut PacketWriter<'_>,
) -> Result<(), EncodeOutOfSpace> {
    env.push_add_cid(w)?;
    let crc = env.crc.crc7(env.uncomp_header) & 0x7f;
    let tmp = &ctxt.tmp;
    let x = decision.extension != Extension::None;

    match decision.packet_type {
        RohcPacketType::Uor2 => {
            let sn_field = match decision.extension {
                Extension::None => sn as u8 & 0x1f,
                Extension::Ext0 => (sn >> 3) as u8 & 0x1f,
                Extension::Ext3 => {
                    if tmp.sn_bits > 5 {
                        (sn >> 8) as u8 & 0x1f
                    } else {
                        sn as u8 & 0x1f
                    }
                }
            };
            w.push(0xc0 | sn_field)?;
            env.push_large_cid(w)?;
            w.push((u8::from(x) << 7) | crc)?;
        }
        RohcPacketType::Uor2Id | RohcPacketType::Uor2Ts => {
            let is_ts = decision.packet_type == RohcPacketType::Uor2Ts;
            let field = if is_ts {
                ctxt.transport
                    .rtp()
                    .map(|rtp| rtp.ts.scaled() as u16)
                    .unwrap_or(0)
            } else {
                tmp.outer_id_offset
            };
            let field5 = match decision.extension {
                Extension::Ext0 => (field >> 3) as u8 & 0x1f,
                _ => field as u8 & 0x1f,
            };
            let sn6 = match decision.extension {
                Extension::None => sn as u8 & 0x3f,
                Extension::Ext0 => (sn >> 3) as u8 & 0x3f,
                Extension::Ext3 => {
                    if tmp.sn_bits > 6 {
                        (sn >> 8) as u8 & 0x3f
                    } else {
                        sn as u8 & 0x3f
                    }
                }
            };
            w.push(0xc0 | field5)?;
            env.push_large_cid(w)?;
            let t = u8::from(is_ts) << 7;
            let m = u8::from(tmp.marker) << 6;
            w.push(t | m | sn6)?;
            w.push((u8::from(x) << 7) | crc)?;
        }
        _ => return Err(EncodeOutOfSpace),
    }

    match decision.extension {
        Extension::None => {}
        Extension::Ext0 => {
            let field3 = match decision.packet_type {
                RohcPacketType::Uor2Ts => ctxt
                    .transport
                    .rtp()
                    .map(|rtp| rtp.ts.scaled() as u8)
                    .unwrap_or(0),
                _ => tmp.outer_id_offset as u8,
            };
            w.push(((sn as u8 & 0x07) << 3) | (field3 & 0x07))?;
        }
        Extension::Ext3 => write_ext3(ctxt, pkt, env, sn, decision.packet_type, w)?,
    }

    write_irregular_tail(ctxt, pkt, w)
}

/// Extension 3 (RFC 3095, §5.7.5; non-RTP layout per §5.11.4).
fn write_ext3(
    ctxt: &Rfc3095Ctxt,
    pkt: &ParsedPacket<'_>,
    env: &BuildEnv<'_>,
    sn: u16,
    packet_type: RohcPacketType,
    w: &mut PacketWriter<'_>,
) -> Result<(), EncodeOutOfSpace> {
    let tmp = &ctxt.tmp;
    let is_rtp = ctxt.transport.is_rtp();

    // the header described by the inner flags octet is the innermost
    let (inner_info, inner_ip) = match (&ctxt.inner_ip, pkt.inner()) {
        (Some(info), Some(ip)) => (info, *ip),
        _ => (&ctxt.outer_ip, *pkt.outer()),
    };
    let two_headers = ctxt.inner_ip.is_some();

    let inner_tos = inner_info.tos_count < OA_REPETITIONS;
    let inner_ttl = inner_info.ttl_count < OA_REPETITIONS;
    let inner_pr = inner_info.protocol_count < OA_REPETITIONS;
    let inner_df = inner_info
        .v4()
        .map(|v4| v4.df_count < OA_REPETITIONS)
        .unwrap_or(false);
    // a recently flipped NBO/RND flag is repeated through the flags
    // octet as well
    let inner_flags_unstable = inner_info
        .v4()
        .map(|v4| v4.nbo_count < OA_REPETITIONS || v4.rnd_count < OA_REPETITIONS)
        .unwrap_or(false);
    let ip_flag = inner_tos || inner_ttl || inner_pr || inner_df || inner_flags_unstable;

    let outer_tos = two_headers && ctxt.outer_ip.tos_count < OA_REPETITIONS;
    let outer_ttl = two_headers && ctxt.outer_ip.ttl_count < OA_REPETITIONS;
    let outer_pr = two_headers && ctxt.outer_ip.protocol_count < OA_REPETITIONS;
    let outer_flags_unstable = two_headers
        && ctxt
            .outer_ip
            .v4()
            .map(|v4| v4.nbo_count < OA_REPETITIONS || v4.rnd_count < OA_REPETITIONS)
            .unwrap_or(false);
    let ip2_flag = outer_tos || outer_ttl || outer_pr || outer_flags_unstable;

    let base_sn_bits = if is_rtp { 6 } else { 5 };
    let s = tmp.sn_bits > base_sn_bits;
    let base_id_bits = match packet_type {
        RohcPacketType::Uor2Id => 5,
        RohcPacketType::Uor2 => 0,
        _ => 0,
    };
    let i = match packet_type {
        RohcPacketType::Uor2Ts => tmp.outer_id_bits > 0,
        _ => tmp.outer_id_bits > base_id_bits,
    };
    let rts = is_rtp
        && if packet_type == RohcPacketType::Uor2Ts {
            // the base octet holds 5 scaled bits at most
            tmp.ts_bits > 5
        } else {
            tmp.ts_bits > 0 && !tmp.ts_deducible
        };
    // announce a freshly established TS stride through the TSS field
    let tss = ctxt
        .transport
        .rtp()
        .map(|rtp| rtp.ts.is_scaled() && !rtp.stride_announced)
        .unwrap_or(false);
    let rtp_flag = is_rtp
        && (tmp.marker_changed
            || tss
            || ctxt
                .transport
                .rtp()
                .map(|rtp| rtp.payload_type_count < OA_REPETITIONS)
                .unwrap_or(false));

    // flags octet
    if is_rtp {
        w.push(
            0xc0 | (u8::from(s) << 5)
                | (u8::from(rts) << 4)
                // Tsc = 0: the TS below is unscaled
                | (u8::from(i) << 2)
                | (u8::from(ip_flag) << 1)
                | u8::from(rtp_flag),
        )?;
    } else {
        w.push(
            0xc0 | (u8::from(s) << 5)
                | (env.mode.wire_value() << 3)
                | (u8::from(i) << 2)
                | (u8::from(ip_flag) << 1)
                | u8::from(ip2_flag),
        )?;
    }

    // inner / outer IP header flags octets
    if ip_flag {
        let v4 = inner_info.v4();
        w.push(
            (u8::from(inner_tos) << 7)
                | (u8::from(inner_ttl) << 6)
                | (u8::from(inner_df) << 5)
                | (u8::from(inner_pr) << 4)
                | (u8::from(v4.map(|v| v.nbo).unwrap_or(true)) << 2)
                | (u8::from(v4.map(|v| v.rnd).unwrap_or(false)) << 1)
                | u8::from(is_rtp && ip2_flag),
        )?;
    }
    if ip2_flag {
        w.push(
            (u8::from(outer_tos) << 7)
                | (u8::from(outer_ttl) << 6)
                | (u8::from(outer_pr) << 4)
                | (u8::from(
                    ctxt.outer_ip.v4().map(|v| v.nbo).unwrap_or(true),
                ) << 2)
                | (u8::from(
                    ctxt.outer_ip.v4().map(|v| v.rnd).unwrap_or(false),
                ) << 1),
        )?;
    }

    if s {
        w.push(sn as u8)?;
    }
    if rts {
        // unscaled TS, truncated to the largest SDVL form
        let ts = ctxt
            .transport
            .rtp()
            .map(|rtp| rtp.ts.last_ts())
            .unwrap_or(0);
        w.push_sdvl(ts & 0x1fff_ffff)?;
    }

    // inner header fields
    if inner_tos {
        w.push(inner_ip.tos_or_traffic_class())?;
    }
    if inner_ttl {
        w.push(inner_ip.ttl_or_hop_limit())?;
    }
    if inner_pr {
        w.push(inner_ip.transport_protocol())?;
    }

    if i {
        // the raw outer IP-ID
        let id = pkt
            .outer()
            .v4()
            .map(|v4| v4.identification())
            .unwrap_or(0);
        w.push_u16(id)?;
    }

    // outer header fields
    if outer_tos {
        w.push(pkt.outer().tos_or_traffic_class())?;
    }
    if outer_ttl {
        w.push(pkt.outer().ttl_or_hop_limit())?;
    }
    if outer_pr {
        w.push(pkt.outer().transport_protocol())?;
    }

    if rtp_flag {
        let rtp = ctxt.transport.rtp().ok_or(EncodeOutOfSpace)?;
        let rpt = rtp.payload_type_count < OA_REPETITIONS;
        w.push(
            (env.mode.wire_value() << 6)
                | (u8::from(rpt) << 5)
                | (u8::from(tmp.marker) << 4)
                | (u8::from(tss) << 1),
        )?;
        if rpt {
            w.push(rtp.payload_type & 0x7f)?;
        }
        if tss {
            w.push_sdvl(rtp.ts.stride() & 0x1fff_ffff)?;
        }
    }

    Ok(())
}

/// Static chain of IR packets (RFC 3095, §5.7.7.3-§5.7.7.6).
fn write_static_chain(
    ctxt: &Rfc3095Ctxt,
    pkt: &ParsedPacket<'_>,
    w: &mut PacketWriter<'_>,
) -> Result<(), EncodeOutOfSpace> {
    write_ip_static(pkt.outer(), w)?;
    if let Some(inner) = pkt.inner() {
        write_ip_static(inner, w)?;
    }
    match &ctxt.transport {
        TransportCtxt::Ip => {}
        TransportCtxt::Udp(_) | TransportCtxt::UdpLite(_) => {
            let udp = udp_slice(pkt)?;
            w.push_u16(udp.source_port())?;
            w.push_u16(udp.destination_port())?;
        }
        TransportCtxt::Rtp(_) => {
            let udp = udp_slice(pkt)?;
            w.push_u16(udp.source_port())?;
            w.push_u16(udp.destination_port())?;
            let rtp = rtp_slice(pkt)?;
            w.push_u32(rtp.ssrc())?;
        }
    }
    Ok(())
}

fn write_ip_static(ip: &IpSlice<'_>, w: &mut PacketWriter<'_>) -> Result<(), EncodeOutOfSpace> {
    match ip {
        IpSlice::V4(v4) => {
            w.push(0x40)?;
            w.push(v4.protocol())?;
            w.push_slice(&v4.source())?;
            w.push_slice(&v4.destination())?;
        }
        IpSlice::V6(v6) => {
            let flow = v6.flow_label();
            w.push(0x60 | ((flow >> 16) as u8 & 0x0f))?;
            w.push_u16(flow as u16)?;
            w.push(v6.next_header())?;
            w.push_slice(&v6.source())?;
            w.push_slice(&v6.destination())?;
        }
    }
    Ok(())
}

/// Dynamic chain of IR and IR-DYN packets.
fn write_dynamic_chain(
    ctxt: &Rfc3095Ctxt,
    pkt: &ParsedPacket<'_>,
    sn: u16,
    w: &mut PacketWriter<'_>,
) -> Result<(), EncodeOutOfSpace> {
    write_ip_dynamic(&ctxt.outer_ip, pkt.outer(), w)?;
    if let (Some(info), Some(ip)) = (&ctxt.inner_ip, pkt.inner()) {
        write_ip_dynamic(info, ip, w)?;
    }
    match &ctxt.transport {
        TransportCtxt::Ip => {}
        TransportCtxt::Udp(_) => {
            let udp = udp_slice(pkt)?;
            w.push_u16(udp.checksum())?;
        }
        TransportCtxt::UdpLite(_) => {
            let udp = udp_slice(pkt)?;
            w.push_u16(udp.checksum_coverage())?;
            w.push_u16(udp.checksum())?;
        }
        TransportCtxt::Rtp(rtp_ctxt) => {
            let rtp = rtp_slice(pkt)?;
            let announce_stride = rtp_ctxt.ts.is_scaled();
            w.push((2 << 6)
                | (u8::from(rtp.padding()) << 5)
                | (u8::from(announce_stride) << 4))?;
            w.push((u8::from(rtp.marker()) << 7) | rtp.payload_type())?;
            w.push_u16(sn)?;
            w.push_u32(rtp.timestamp())?;
            // empty CSRC list
            w.push(0x00)?;
            if announce_stride {
                // |000|X=0|Mode|TIS=0|TSS=1|
                w.push((OperatingMode::Unidirectional.wire_value() << 2) | 0x01)?;
                w.push_sdvl(rtp_ctxt.ts.stride() & 0x1fff_ffff)?;
            }
        }
    }
    Ok(())
}

fn write_ip_dynamic(
    info: &super::context::IpHeaderInfo,
    ip: &IpSlice<'_>,
    w: &mut PacketWriter<'_>,
) -> Result<(), EncodeOutOfSpace> {
    match ip {
        IpSlice::V4(v4) => {
            let flags = info.v4().map(|i| (i.rnd, i.nbo)).unwrap_or((false, true));
            w.push(v4.tos())?;
            w.push(v4.ttl())?;
            w.push_u16(v4.identification())?;
            w.push(
                (u8::from(v4.dont_fragment()) << 7)
                    | (u8::from(flags.0) << 6)
                    | (u8::from(flags.1) << 5),
            )?;
        }
        IpSlice::V6(v6) => {
            w.push(v6.traffic_class())?;
            w.push(v6.hop_limit())?;
        }
    }
    Ok(())
}

/// The 16 bit SN trailing IR and IR-DYN packets of the non-RTP
/// profiles (RFC 3095, §5.7.7.1; the RTP SN lives in the RTP dynamic
/// part instead).
fn write_ir_remainder(
    ctxt: &Rfc3095Ctxt,
    sn: u16,
    w: &mut PacketWriter<'_>,
) -> Result<(), EncodeOutOfSpace> {
    if !ctxt.transport.is_rtp() {
        w.push_u16(sn)?;
    }
    Ok(())
}

/// Fields sent uncompressed after every UO/UOR packet: random IP-IDs,
/// the UDP-Lite coverage and the UDP checksum.
fn write_irregular_tail(
    ctxt: &Rfc3095Ctxt,
    pkt: &ParsedPacket<'_>,
    w: &mut PacketWriter<'_>,
) -> Result<(), EncodeOutOfSpace> {
    if let (Some(info), Some(v4)) = (ctxt.outer_ip.v4(), pkt.outer().v4()) {
        if info.rnd {
            w.push_u16(v4.identification())?;
        }
    }
    if let (Some(info), Some(ip)) = (&ctxt.inner_ip, pkt.inner()) {
        if let (Some(i), Some(v4)) = (info.v4(), ip.v4()) {
            if i.rnd {
                w.push_u16(v4.identification())?;
            }
        }
    }
    match &ctxt.transport {
        TransportCtxt::Ip => {}
        TransportCtxt::Udp(udp_ctxt) => {
            if udp_ctxt.checksum_used {
                w.push_u16(udp_slice(pkt)?.checksum())?;
            }
        }
        TransportCtxt::UdpLite(lite) => {
            let udp = udp_slice(pkt)?;
            if !lite.coverage_inferred {
                w.push_u16(udp.checksum_coverage())?;
            }
            w.push_u16(udp.checksum())?;
        }
        TransportCtxt::Rtp(rtp_ctxt) => {
            if rtp_ctxt.udp.checksum_used {
                w.push_u16(udp_slice(pkt)?.checksum())?;
            }
        }
    }
    Ok(())
}

fn udp_slice<'a>(pkt: &ParsedPacket<'a>) -> Result<UdpSlice<'a>, EncodeOutOfSpace> {
    pkt.udp().map_err(|_| EncodeOutOfSpace)
}

fn rtp_slice<'a>(pkt: &ParsedPacket<'a>) -> Result<RtpSlice<'a>, EncodeOutOfSpace> {
    let data = pkt.from_transport();
    if data.len() < 8 {
        return Err(EncodeOutOfSpace);
    }
    RtpSlice::from_slice(&data[8..], Layer::RtpHeader).map_err(|_| EncodeOutOfSpace)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rfc3095::context::UdpCtxt;
    use crate::rfc3095::decide::{Extension, PacketDecision};
    use crate::ContextState;

    fn ipv4_udp_packet(id: u16) -> Vec<u8> {
        let mut bytes = vec![
            0x45, 0x00, 0x00, 0x1c, (id >> 8) as u8, id as u8, 0x40, 0x00, 0x40, 17, 0, 0, 10,
            0, 0, 1, 10, 0, 0, 2,
        ];
        bytes.extend([0x13, 0x8c, 0x13, 0x8c, 0x00, 0x08, 0x00, 0x00]);
        bytes
    }

    fn env<'a>(crc: &'a CrcTables, header: &'a [u8]) -> BuildEnv<'a> {
        BuildEnv {
            cid_type: CidType::Small,
            cid: 0,
            crc,
            profile: ProfileId::Udp,
            mode: OperatingMode::Unidirectional,
            uncomp_header: header,
        }
    }

    #[test]
    fn ir_layout() {
        let bytes = ipv4_udp_packet(0x1234);
        let pkt = ParsedPacket::from_slice(&bytes).unwrap();
        let udp = pkt.udp().unwrap();
        let ctxt = Rfc3095Ctxt::new(
            &pkt,
            TransportCtxt::Udp(UdpCtxt::new(
                udp.source_port(),
                udp.destination_port(),
                udp.checksum(),
            )),
            99,
            4,
        );
        let crc = CrcTables::new();
        let e = env(&crc, &bytes[..28]);
        let mut dest = [0u8; MAX_HEADER_LEN];
        let decision = PacketDecision {
            state: ContextState::Ir,
            packet_type: RohcPacketType::Ir,
            extension: Extension::None,
            refreshed_ir: false,
            refreshed_fo: false,
        };
        let len = build_packet(&ctxt, &pkt, &e, 100, &decision, &mut dest).unwrap();

        // type, profile, crc + ipv4 static (10) + udp static (4)
        // + ipv4 dynamic (5) + udp dynamic (2) + sn (2)
        assert_eq!(3 + 10 + 4 + 5 + 2 + 2, len);
        assert_eq!(0xfd, dest[0]);
        assert_eq!(0x02, dest[1]);
        // static chain starts with the version nibble & protocol
        assert_eq!(0x40, dest[3]);
        assert_eq!(17, dest[4]);
        // the SN trails the packet
        assert_eq!(&dest[len - 2..len], &[0u8, 100][..]);
        // zeroing the CRC octet and recomputing matches
        let mut copy = dest[..len].to_vec();
        let crc_byte = copy[2];
        copy[2] = 0;
        assert_eq!(crc_byte, crc.crc8(&copy));
    }

    #[test]
    fn uo0_is_one_byte_for_cid_zero() {
        let bytes = ipv4_udp_packet(0x1234);
        let pkt = ParsedPacket::from_slice(&bytes).unwrap();
        let ctxt = Rfc3095Ctxt::new(&pkt, TransportCtxt::Ip, 99, 4);
        let crc = CrcTables::new();
        let e = BuildEnv {
            profile: ProfileId::Ip,
            ..env(&crc, &bytes[..20])
        };
        let mut dest = [0u8; MAX_HEADER_LEN];
        let decision = PacketDecision {
            state: ContextState::So,
            packet_type: RohcPacketType::Uo0,
            extension: Extension::None,
            refreshed_ir: false,
            refreshed_fo: false,
        };
        let len = build_packet(&ctxt, &pkt, &e, 5, &decision, &mut dest).unwrap();
        assert_eq!(1, len);
        // discriminator bit 7 is zero, SN sits in bits 6..3
        assert_eq!(0, dest[0] >> 7);
        assert_eq!(5, (dest[0] >> 3) & 0x0f);
    }

    #[test]
    fn add_cid_octet_prefixes_small_cids() {
        let bytes = ipv4_udp_packet(0x1234);
        let pkt = ParsedPacket::from_slice(&bytes).unwrap();
        let ctxt = Rfc3095Ctxt::new(&pkt, TransportCtxt::Ip, 99, 4);
        let crc = CrcTables::new();
        let mut e = BuildEnv {
            profile: ProfileId::Ip,
            ..env(&crc, &bytes[..20])
        };
        e.cid = 3;
        let mut dest = [0u8; MAX_HEADER_LEN];
        let decision = PacketDecision {
            state: ContextState::So,
            packet_type: RohcPacketType::Uo0,
            extension: Extension::None,
            refreshed_ir: false,
            refreshed_fo: false,
        };
        let len = build_packet(&ctxt, &pkt, &e, 5, &decision, &mut dest).unwrap();
        assert_eq!(2, len);
        assert_eq!(0xe3, dest[0]);
    }

    #[test]
    fn uor2_with_ext0_carries_split_sn() {
        let bytes = ipv4_udp_packet(0x1234);
        let pkt = ParsedPacket::from_slice(&bytes).unwrap();
        let mut ctxt = Rfc3095Ctxt::new(&pkt, TransportCtxt::Ip, 99, 4);
        ctxt.tmp.sn_bits = 8;
        ctxt.tmp.outer_id_offset = 0x05;
        let crc = CrcTables::new();
        let e = BuildEnv {
            profile: ProfileId::Ip,
            ..env(&crc, &bytes[..20])
        };
        let mut dest = [0u8; MAX_HEADER_LEN];
        let decision = PacketDecision {
            state: ContextState::Fo,
            packet_type: RohcPacketType::Uor2,
            extension: Extension::Ext0,
            refreshed_ir: false,
            refreshed_fo: false,
        };
        let sn = 0b1011_0101;
        let len = build_packet(&ctxt, &pkt, &e, sn, &decision, &mut dest).unwrap();
        assert_eq!(3, len);
        // base: 110 + SN bits 7..3
        assert_eq!(0xc0 | 0b10110, dest[0]);
        // X bit set
        assert_eq!(1, dest[1] >> 7);
        // ext 0: 00 + SN bits 2..0 + IP-ID bits
        assert_eq!(0b00_101_101, dest[2]);
    }
}
