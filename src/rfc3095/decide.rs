//! State transitions and packet type selection (RFC 3095, §4.4 and the
//! per-profile decision tables of RFC 3843 / the RTP profile).

use super::context::{Rfc3095Ctxt, OA_REPETITIONS};
use crate::{ContextState, RohcPacketType};

/// Extension appended to type-2 (and type-1) packets.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Extension {
    None,
    /// 3 extra SN bits plus 3 IP-ID (or TS) bits.
    Ext0,
    /// The flags based extension carrying SN, IP-ID, header fields and
    /// (for RTP) TS, marker and payload type.
    Ext3,
}

/// Outcome of the per-packet decision.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct PacketDecision {
    pub state: ContextState,
    pub packet_type: RohcPacketType,
    pub extension: Extension,
    /// The periodic IR refresh fired for this packet.
    pub refreshed_ir: bool,
    /// The periodic FO refresh fired for this packet.
    pub refreshed_fo: bool,
}

/// Decides the state for the packet being compressed.
///
/// Counters are not reset when a periodic refresh demotes the state:
/// the refresh is a single forced packet and the context climbs back
/// through FO/SO on the packets that follow.
pub(crate) fn decide_state(
    ctxt: &Rfc3095Ctxt,
    current: ContextState,
    ir_timeout: u32,
    fo_timeout: u32,
) -> (ContextState, bool, bool) {
    let tmp = &ctxt.tmp;
    let stable = tmp.send_static == 0 && tmp.send_dynamic == 0 && !tmp.flag_flipped;

    let mut next = current;
    // a change while in SO can not be described there
    if next == ContextState::So && !stable {
        next = ContextState::Fo;
    }
    // upward transitions once enough repetitions went out
    if next == ContextState::Ir && ctxt.ir_count >= u32::from(OA_REPETITIONS) && stable {
        next = ContextState::Fo;
    }
    if next == ContextState::Fo && ctxt.fo_count >= u32::from(OA_REPETITIONS) && stable {
        next = ContextState::So;
    }

    // periodic refreshes (counters are advanced after the packet went
    // out, see commit)
    let mut refreshed_ir = false;
    let mut refreshed_fo = false;
    if ctxt.refresh_ir_count >= ir_timeout {
        next = ContextState::Ir;
        refreshed_ir = true;
    } else if next == ContextState::So && ctxt.refresh_fo_count >= fo_timeout {
        next = ContextState::Fo;
        refreshed_fo = true;
    }

    (next, refreshed_ir, refreshed_fo)
}

/// True when the outer IP-ID can ride the 6 bit field of a UO-1 (or
/// the 5/6 bit fields of the type-2 packets): IPv4 with an established
/// non-random, network byte order ID.
fn outer_id_field_usable(ctxt: &Rfc3095Ctxt) -> bool {
    match ctxt.outer_ip.v4() {
        Some(v4) => !v4.rnd && v4.nbo,
        None => false,
    }
}

/// Decision table for the First Order state (IR-DYN vs type-2).
pub(crate) fn decide_fo_packet(ctxt: &Rfc3095Ctxt) -> RohcPacketType {
    let tmp = &ctxt.tmp;
    let sid_unstable = ctxt
        .outer_ip
        .v4()
        .map(|v4| v4.sid_count < OA_REPETITIONS)
        .unwrap_or(false)
        || ctxt
            .inner_ip
            .as_ref()
            .and_then(|info| info.v4())
            .map(|v4| v4.sid_count < OA_REPETITIONS)
            .unwrap_or(false);
    let sn_13bits = tmp.sn_bits <= 13;

    if sid_unstable || tmp.flag_flipped {
        // an ID behaviour change can only be described by the dynamic
        // chain
        RohcPacketType::IrDyn
    } else if tmp.inner_id_bits > 0 {
        RohcPacketType::IrDyn
    } else if tmp.send_static > 0 && sn_13bits {
        type2_packet(ctxt)
    } else if ctxt.ip_hdr_count() == 1 && tmp.send_dynamic > 2 {
        RohcPacketType::IrDyn
    } else if ctxt.ip_hdr_count() > 1 && tmp.send_dynamic > 4 {
        RohcPacketType::IrDyn
    } else if sn_13bits {
        type2_packet(ctxt)
    } else {
        RohcPacketType::IrDyn
    }
}

/// Decision table for the Second Order state.
pub(crate) fn decide_so_packet(ctxt: &Rfc3095Ctxt) -> RohcPacketType {
    let tmp = &ctxt.tmp;
    let inner_ok = ctxt.ip_hdr_count() == 1 || tmp.inner_id_bits == 0;

    if tmp.inner_id_bits > 0 {
        return RohcPacketType::IrDyn;
    }

    if ctxt.transport.is_rtp() {
        decide_so_rtp(ctxt)
    } else if tmp.sn_bits <= 4 && tmp.outer_id_bits == 0 && inner_ok {
        RohcPacketType::Uo0
    } else if tmp.sn_bits <= 5
        && tmp.outer_id_bits <= 6
        && outer_id_field_usable(ctxt)
        && inner_ok
    {
        RohcPacketType::Uo1
    } else if tmp.sn_bits <= 13 {
        RohcPacketType::Uor2
    } else {
        RohcPacketType::IrDyn
    }
}

/// RTP flavour of the SO decision: the UO-1 family splits on whether
/// the IP-ID or the scaled TS needs bits, and the type-2 packets
/// always use the distinguishable -ID / -TS discriminators.
fn decide_so_rtp(ctxt: &Rfc3095Ctxt) -> RohcPacketType {
    let tmp = &ctxt.tmp;
    let need_id = tmp.outer_id_bits > 0;

    if tmp.sn_bits <= 4 && !need_id && !tmp.marker && tmp.ts_deducible {
        RohcPacketType::Uo0
    } else if tmp.sn_bits <= 4 && !need_id && tmp.ts_bits <= 5 {
        RohcPacketType::Uo1Ts
    } else if tmp.sn_bits <= 4
        && need_id
        && tmp.outer_id_bits <= 5
        && outer_id_field_usable(ctxt)
        && tmp.ts_deducible
        && !tmp.marker_changed
        && !tmp.marker
    {
        RohcPacketType::Uo1Id
    } else if tmp.sn_bits <= 13 {
        type2_packet(ctxt)
    } else {
        RohcPacketType::IrDyn
    }
}

/// The type-2 packet of the bound profile: UOR-2 for the non-RTP
/// profiles, UOR-2-ID / UOR-2-TS for RTP (plain UOR-2 is never used
/// for RTP so the decompressor can always tell the variants apart).
fn type2_packet(ctxt: &Rfc3095Ctxt) -> RohcPacketType {
    if ctxt.transport.is_rtp() {
        if ctxt.tmp.outer_id_bits > 0 {
            RohcPacketType::Uor2Id
        } else {
            RohcPacketType::Uor2Ts
        }
    } else {
        RohcPacketType::Uor2
    }
}

/// Picks the extension of a type-2 packet.
pub(crate) fn decide_extension(ctxt: &Rfc3095Ctxt, packet_type: RohcPacketType) -> Extension {
    let tmp = &ctxt.tmp;

    // anything beyond SN and IP-ID/TS bits needs the flags extension
    let needs_fields = tmp.send_static > 0
        || tmp.send_dynamic > 0
        || tmp.marker_changed
        || (ctxt.transport.is_rtp() && !matches!(packet_type, RohcPacketType::Uor2Ts) && tmp.ts_bits > 0 && !tmp.ts_deducible);

    let (base_sn_bits, base_field_bits) = match packet_type {
        RohcPacketType::Uor2 => (5u8, 0u8),
        RohcPacketType::Uor2Id => (6, 5),
        RohcPacketType::Uor2Ts => (6, 5),
        _ => return Extension::None,
    };

    let field_bits = match packet_type {
        RohcPacketType::Uor2 | RohcPacketType::Uor2Id => tmp.outer_id_bits,
        RohcPacketType::Uor2Ts => tmp.ts_bits,
        _ => 0,
    };

    if !needs_fields && tmp.sn_bits <= base_sn_bits && field_bits <= base_field_bits {
        Extension::None
    } else if !needs_fields
        && tmp.sn_bits <= base_sn_bits + 3
        && field_bits <= base_field_bits + 3
    {
        Extension::Ext0
    } else {
        Extension::Ext3
    }
}

/// Full decision for one packet of an RFC 3095 family profile.
pub(crate) fn decide_packet(
    ctxt: &Rfc3095Ctxt,
    current: ContextState,
    ir_timeout: u32,
    fo_timeout: u32,
) -> PacketDecision {
    let (state, refreshed_ir, refreshed_fo) = decide_state(ctxt, current, ir_timeout, fo_timeout);
    let packet_type = match state {
        ContextState::Ir => RohcPacketType::Ir,
        ContextState::Fo => decide_fo_packet(ctxt),
        ContextState::So => decide_so_packet(ctxt),
    };
    let extension = match packet_type {
        RohcPacketType::Uor2 | RohcPacketType::Uor2Id | RohcPacketType::Uor2Ts => {
            decide_extension(ctxt, packet_type)
        }
        _ => Extension::None,
    };
    PacketDecision {
        state,
        packet_type,
        extension,
        refreshed_ir,
        refreshed_fo,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rfc3095::context::TransportCtxt;
    use crate::packet::ParsedPacket;

    fn ipv4_packet(id: u16) -> Vec<u8> {
        vec![
            0x45, 0x00, 0x00, 0x14, (id >> 8) as u8, id as u8, 0x40, 0x00, 0x40, 59, 0, 0, 10,
            0, 0, 1, 10, 0, 0, 2,
        ]
    }

    fn settled_ctxt() -> Rfc3095Ctxt {
        let bytes = ipv4_packet(50);
        let pkt = ParsedPacket::from_slice(&bytes).unwrap();
        let mut ctxt = Rfc3095Ctxt::new(&pkt, TransportCtxt::Ip, 100, 4);
        for id in [51u16, 52, 53, 54] {
            let bytes = ipv4_packet(id);
            let pkt = ParsedPacket::from_slice(&bytes).unwrap();
            let sn = ctxt.next_sn(&pkt);
            ctxt.observe(&pkt, sn);
            ctxt.commit_packet(&pkt, sn, true);
            ctxt.ir_count += 1;
        }
        ctxt
    }

    #[test]
    fn settled_context_promotes_to_fo() {
        let ctxt = settled_ctxt();
        let (state, refreshed_ir, refreshed_fo) = decide_state(&ctxt, ContextState::Ir, 1700, 700);
        assert_eq!(ContextState::Fo, state);
        assert!(!refreshed_ir);
        assert!(!refreshed_fo);
    }

    #[test]
    fn so_packet_is_uo0_for_settled_flow() {
        let mut ctxt = settled_ctxt();
        ctxt.fo_count = 3;
        let bytes = ipv4_packet(55);
        let pkt = ParsedPacket::from_slice(&bytes).unwrap();
        let sn = ctxt.next_sn(&pkt);
        ctxt.observe(&pkt, sn);
        let decision = decide_packet(&ctxt, ContextState::So, 1700, 700);
        assert_eq!(ContextState::So, decision.state);
        assert_eq!(RohcPacketType::Uo0, decision.packet_type);
    }

    #[test]
    fn refresh_forces_ir() {
        let mut ctxt = settled_ctxt();
        ctxt.fo_count = 3;
        ctxt.refresh_ir_count = 5;
        let bytes = ipv4_packet(55);
        let pkt = ParsedPacket::from_slice(&bytes).unwrap();
        let sn = ctxt.next_sn(&pkt);
        ctxt.observe(&pkt, sn);
        let decision = decide_packet(&ctxt, ContextState::So, 5, 3);
        assert_eq!(ContextState::Ir, decision.state);
        assert_eq!(RohcPacketType::Ir, decision.packet_type);
    }

    #[test]
    fn flag_flip_forces_ir_dyn_in_fo() {
        let mut ctxt = settled_ctxt();
        // a shuffled ID flips the RND flag
        let bytes = ipv4_packet(0x7b99);
        let pkt = ParsedPacket::from_slice(&bytes).unwrap();
        let sn = ctxt.next_sn(&pkt);
        ctxt.observe(&pkt, sn);
        assert!(ctxt.tmp.flag_flipped);
        let decision = decide_packet(&ctxt, ContextState::So, 1700, 700);
        assert_eq!(ContextState::Fo, decision.state);
        assert_eq!(RohcPacketType::IrDyn, decision.packet_type);
    }

    #[test]
    fn large_sn_jump_needs_ir_dyn() {
        let mut ctxt = settled_ctxt();
        ctxt.tmp.sn_bits = 16;
        assert_eq!(RohcPacketType::IrDyn, decide_fo_packet(&ctxt));
    }
}
