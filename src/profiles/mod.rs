//! The compression profiles and their registry.
//!
//! Profiles are evaluated in a fixed priority order; the first enabled
//! one whose `matches` accepts the packet compresses the flow. Each
//! profile is a stateless capability record, all flow state lives in
//! the per-CID contexts.

mod ip;
mod rtp;
mod udp;
mod udp_lite;
mod uncompressed;

pub(crate) use ip::IpProfile;
pub(crate) use rtp::RtpProfile;
pub(crate) use udp::UdpProfile;
pub(crate) use udp_lite::UdpLiteProfile;
pub(crate) use uncompressed::UncompressedProfile;

use crate::compressor::CompressorCore;
use crate::context::{Context, ContextTable, ProfileData};
use crate::feedback::{DeliveredFeedback, FeedbackAck, FeedbackKind};
use crate::packet::{IpSlice, ParsedPacket};
use crate::rfc3095::{build_packet, decide_packet, BuildEnv, EncodeOutOfSpace, Rfc3095Ctxt};
use crate::{ContextState, OperatingMode, ProfileId, RohcPacketType, TraceLevel};

/// What a successful profile `encode` produced.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct EncodedHeader {
    /// Bytes of compressed header written.
    pub header_len: usize,
    pub packet_type: RohcPacketType,
    /// Offset of the first payload byte in the uncompressed packet.
    pub payload_offset: usize,
}

/// Capability surface of one compression profile.
pub(crate) trait Profile {
    fn id(&self) -> ProfileId;

    /// Whether the profile can compress the packet; on success the
    /// flow fingerprint used to prune the context lookup is returned.
    fn matches(
        &self,
        core: &CompressorCore,
        contexts: &ContextTable,
        pkt: &ParsedPacket<'_>,
    ) -> Option<u64>;

    /// Builds the profile specific state for a new context.
    fn create(&self, core: &CompressorCore, pkt: &ParsedPacket<'_>) -> ProfileData;

    /// Flow identity test beyond the fingerprint.
    fn check_context(&self, ctx: &Context, pkt: &ParsedPacket<'_>) -> bool;

    /// Compresses the packet's headers into `dest`.
    fn encode(
        &self,
        core: &CompressorCore,
        ctx: &mut Context,
        pkt: &ParsedPacket<'_>,
        dest: &mut [u8],
    ) -> Result<EncodedHeader, EncodeOutOfSpace>;

    /// Applies feedback delivered for the context.
    fn feedback(&self, core: &CompressorCore, ctx: &mut Context, fb: &DeliveredFeedback);

    /// Moves the context back to its initial state.
    fn reinit(&self, ctx: &mut Context);

    /// True when the context is bound to the given UDP port.
    fn uses_udp_port(&self, _ctx: &Context, _port: u16) -> bool {
        false
    }
}

/// Number of implemented profiles.
pub(crate) const PROFILE_COUNT: usize = 5;

/// The profiles in matching priority order (RTP before UDP, IP-only
/// after every other IP based profile, Uncompressed last).
pub(crate) static PROFILES: [&(dyn Profile + Sync); PROFILE_COUNT] = [
    &RtpProfile,
    &UdpProfile,
    &UdpLiteProfile,
    &IpProfile,
    &UncompressedProfile,
];

/// Registry position of a profile, if it is implemented.
pub(crate) fn profile_index(id: ProfileId) -> Option<usize> {
    PROFILES.iter().position(|p| p.id() == id)
}

/// FNV-1a over the flow identifying fields.
pub(crate) fn flow_key(parts: &[&[u8]]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for part in parts {
        for &byte in *part {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100_0000_01b3);
        }
    }
    hash
}

/// Fingerprint of the IP headers (addresses, version, IPv6 flow
/// label), common to all IP based profiles.
pub(crate) fn ip_flow_key_parts(pkt: &ParsedPacket<'_>, extra: &[&[u8]]) -> u64 {
    let outer = collect_ip_parts(pkt.outer());
    let inner = pkt.inner().map(collect_ip_parts);

    let mut parts: Vec<&[u8]> = Vec::with_capacity(extra.len() + 6);
    parts.push(&outer.0);
    parts.push(&outer.1);
    parts.push(&outer.2);
    if let Some(inner) = &inner {
        parts.push(&inner.0);
        parts.push(&inner.1);
        parts.push(&inner.2);
    }
    parts.extend_from_slice(extra);
    flow_key(&parts)
}

/// Source, destination and a version/flow-label tag of one IP header.
fn collect_ip_parts(ip: &IpSlice<'_>) -> ([u8; 16], [u8; 16], [u8; 4]) {
    match ip {
        IpSlice::V4(v4) => {
            let mut src = [0u8; 16];
            let mut dst = [0u8; 16];
            src[..4].copy_from_slice(&v4.source());
            dst[..4].copy_from_slice(&v4.destination());
            (src, dst, [4, 0, 0, 0])
        }
        IpSlice::V6(v6) => {
            let mut label = v6.flow_label().to_be_bytes();
            label[0] |= 0x60;
            (v6.source(), v6.destination(), label)
        }
    }
}

/// Flow identity of the IP headers, common to all IP based profiles.
pub(crate) fn check_ip_flow(ctxt: &Rfc3095Ctxt, pkt: &ParsedPacket<'_>) -> bool {
    if ctxt.inner_ip.is_some() != pkt.inner().is_some() {
        return false;
    }
    if !ctxt.outer_ip.same_flow(pkt.outer()) {
        return false;
    }
    match (&ctxt.inner_ip, pkt.inner()) {
        (Some(info), Some(ip)) => info.same_flow(ip),
        _ => true,
    }
}

/// The `encode` path shared by the RFC 3095 family profiles: change
/// detection, state decision, packet construction and context commit.
pub(crate) fn rfc3095_encode(
    core: &CompressorCore,
    ctx: &mut Context,
    pkt: &ParsedPacket<'_>,
    dest: &mut [u8],
    profile: ProfileId,
    payload_offset: usize,
) -> Result<EncodedHeader, EncodeOutOfSpace> {
    let cid = ctx.cid;
    let state = ctx.state;
    let mode = ctx.mode;
    let ctxt = ctx.data.rfc3095_mut().ok_or(EncodeOutOfSpace)?;

    let sn = ctxt.next_sn(pkt);
    ctxt.observe(pkt, sn);
    let decision = decide_packet(ctxt, state, core.ir_timeout, core.fo_timeout);
    core.trace(TraceLevel::Debug, || {
        format!(
            "CID {}: {} packet in {} state (SN = {})",
            cid, decision.packet_type, decision.state, sn
        )
    });

    let env = BuildEnv {
        cid_type: core.cid_type,
        cid,
        crc: &core.crc,
        profile,
        mode,
        uncomp_header: &pkt.data()[..payload_offset],
    };
    let header_len = build_packet(ctxt, pkt, &env, sn, &decision, dest)?;

    // commit what the packet established
    if decision.refreshed_ir {
        ctxt.refresh_ir_count = 0;
        ctxt.refresh_fo_count = 0;
    }
    if decision.refreshed_fo {
        ctxt.refresh_fo_count = 0;
    }
    ctxt.refresh_ir_count += 1;
    ctxt.refresh_fo_count += 1;
    match decision.state {
        ContextState::Ir => ctxt.ir_count += 1,
        ContextState::Fo => ctxt.fo_count += 1,
        ContextState::So => ctxt.so_count += 1,
    }
    // EXT-3 announces the TS stride through its TSS field, dynamic
    // chains through the RX part
    let announced_stride = decision.packet_type.has_dynamic_chain()
        || decision.extension == crate::rfc3095::Extension::Ext3;
    ctxt.commit_packet(pkt, sn, announced_stride);
    ctx.state = decision.state;

    Ok(EncodedHeader {
        header_len,
        packet_type: decision.packet_type,
        payload_offset,
    })
}

/// The feedback path shared by the RFC 3095 family profiles.
pub(crate) fn rfc3095_feedback(ctx: &mut Context, fb: &DeliveredFeedback) {
    let acktype = match fb.kind {
        FeedbackKind::Feedback1 => FeedbackAck::Ack,
        FeedbackKind::Feedback2 { acktype, .. } => acktype,
    };
    match acktype {
        FeedbackAck::Ack => {
            if ctx.mode == OperatingMode::Unidirectional {
                ctx.mode = OperatingMode::Optimistic;
            }
            if let (FeedbackKind::Feedback2 { sn, .. }, Some(ctxt)) =
                (fb.kind, ctx.data.rfc3095_mut())
            {
                let acked = widen_sn(ctxt.sn, sn);
                ctxt.sn_window.ack_to(acked);
                if let Some(v4) = ctxt.outer_ip.v4_mut() {
                    v4.id_window.ack_to(acked);
                }
                if let Some(v4) = ctxt.inner_ip.as_mut().and_then(|i| i.v4_mut()) {
                    v4.id_window.ack_to(acked);
                }
                if let Some(rtp) = ctxt.transport.rtp_mut() {
                    rtp.ts.ack_to(acked);
                }
            }
        }
        FeedbackAck::Nack => {
            ctx.state = ContextState::Fo;
            if let Some(ctxt) = ctx.data.rfc3095_mut() {
                ctxt.fo_count = 0;
            }
        }
        FeedbackAck::StaticNack => {
            ctx.state = ContextState::Ir;
            if let Some(ctxt) = ctx.data.rfc3095_mut() {
                ctxt.ir_count = 0;
            }
        }
        FeedbackAck::Reserved => {}
    }
}

/// Expands the 12 bit feedback SN around the compressor's own SN.
fn widen_sn(current: u16, sn12: u16) -> u16 {
    let candidate = (current & !0x0fff) | (sn12 & 0x0fff);
    if candidate > current {
        candidate.wrapping_sub(0x1000)
    } else {
        candidate
    }
}

/// The reinit path shared by the RFC 3095 family profiles.
pub(crate) fn rfc3095_reinit(ctx: &mut Context) {
    ctx.state = ContextState::Ir;
    if let Some(ctxt) = ctx.data.rfc3095_mut() {
        ctxt.ir_count = 0;
        ctxt.fo_count = 0;
        ctxt.so_count = 0;
        ctxt.refresh_ir_count = 0;
        ctxt.refresh_fo_count = 0;
        ctxt.sn_window.clear();
        if let Some(v4) = ctxt.outer_ip.v4_mut() {
            v4.id_window.clear();
        }
        if let Some(v4) = ctxt.inner_ip.as_mut().and_then(|i| i.v4_mut()) {
            v4.id_window.clear();
        }
        if let Some(rtp) = ctxt.transport.rtp_mut() {
            rtp.stride_announced = false;
        }
    }
}
