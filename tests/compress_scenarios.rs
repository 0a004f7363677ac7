//! End-to-end behaviour of the compressor over realistic packet
//! sequences: state machine progression, periodic refreshes, IP-ID
//! behaviour changes and RTP stream detection.

use core::time::Duration;
use rohc_comp::{
    CidType, CompressResult, Compressor, ContextState, ProfileId, RohcPacketType,
};

/// An IPv4 header (20 bytes, DF set) followed by a UDP header and
/// payload.
fn ipv4_udp_packet(id: u16, src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let total = 20 + 8 + payload.len();
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
    let udp_len = 8 + payload.len();
    bytes.extend([
        (src_port >> 8) as u8,
        src_port as u8,
        (dst_port >> 8) as u8,
        dst_port as u8,
        (udp_len >> 8) as u8,
        udp_len as u8,
        0x00,
        0x00,
    ]);
    bytes.extend_from_slice(payload);
    bytes
}

/// An IPv4/UDP/RTP packet (version 2, no CSRCs, marker clear).
fn rtp_packet(id: u16, dst_port: u16, sn: u16, ts: u32, payload: &[u8]) -> Vec<u8> {
    let mut rtp = vec![
        0x80,
        96, // payload type 96, no marker
        (sn >> 8) as u8,
        sn as u8,
    ];
    rtp.extend(ts.to_be_bytes());
    rtp.extend(0xdead_beefu32.to_be_bytes()); // ssrc
    rtp.extend_from_slice(payload);
    ipv4_udp_packet(id, 5000, dst_port, &rtp)
}

fn packet_is_legal_in_state(state: ContextState, packet_type: RohcPacketType) -> bool {
    use RohcPacketType::*;
    match state {
        ContextState::Ir => matches!(packet_type, Ir),
        ContextState::Fo => matches!(packet_type, IrDyn | Uor2 | Uor2Id | Uor2Ts | Ir),
        ContextState::So => matches!(
            packet_type,
            Uo0 | Uo1 | Uo1Id | Uo1Ts | Uor2 | Uor2Id | Uor2Ts | IrDyn | Ir
        ),
    }
}

fn compress_and_type(
    comp: &mut Compressor,
    seq: u64,
    packet: &[u8],
) -> (CompressResult, RohcPacketType) {
    let mut out = [0u8; 512];
    let result = comp
        .compress(Duration::from_secs(seq), packet, &mut out)
        .unwrap();
    let info = comp.last_packet_info().unwrap();
    assert!(
        packet_is_legal_in_state(info.state, info.packet_type),
        "{} is not a legal packet in {} state",
        info.packet_type,
        info.state
    );
    (result, info.packet_type)
}

#[test]
fn cold_start_ip_flow_reaches_uo0() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    comp.enable_profile(ProfileId::Ip).unwrap();

    let packet = ipv4_udp_packet(0x0042, 1234, 4321, &[]);
    let mut types = Vec::new();
    for i in 0..10u64 {
        let (result, packet_type) = compress_and_type(&mut comp, i, &packet);
        types.push(packet_type);
        if i >= 6 {
            // settled: a 1 byte UO-0 header in front of the 8 byte
            // payload (the UDP header the IP-only profile leaves)
            assert_eq!(RohcPacketType::Uo0, packet_type);
            assert_eq!(CompressResult::Packet { len: 1 + 8 }, result);
            assert_eq!(1, comp.last_packet_info().unwrap().header_compressed_size);
        }
    }
    assert!(types[..3].iter().all(|&t| t == RohcPacketType::Ir));
    assert!(types[3..6]
        .iter()
        .all(|&t| matches!(t, RohcPacketType::IrDyn | RohcPacketType::Uor2)));
}

#[test]
fn periodic_refreshes_force_ir() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    comp.enable_profile(ProfileId::Ip).unwrap();
    comp.set_periodic_refreshes(5, 3).unwrap();

    let packet = ipv4_udp_packet(0x0042, 1234, 4321, &[]);
    let mut ir_positions = Vec::new();
    for i in 0..20u64 {
        let (_, packet_type) = compress_and_type(&mut comp, i, &packet);
        if packet_type == RohcPacketType::Ir {
            ir_positions.push(i + 1);
        }
    }
    // the initial IR phase, then one forced IR every 5 packets
    assert_eq!(vec![1, 2, 3, 6, 11, 16], ir_positions);
}

#[test]
fn ip_id_randomisation_falls_back_to_ir_dyn() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    comp.enable_profile(ProfileId::Ip).unwrap();

    // sequential IDs settle NBO + not-RND
    let sequential: Vec<u16> = (100..105).collect();
    // shuffled IDs, no sequential pattern in either byte order
    let shuffled = [0x8f21u16, 0x274b, 0xc083, 0x5ad9, 0x33d7];

    let mut types = Vec::new();
    for (i, id) in sequential.iter().chain(shuffled.iter()).enumerate() {
        let packet = ipv4_udp_packet(*id, 1234, 4321, &[]);
        let (_, packet_type) = compress_and_type(&mut comp, i as u64, &packet);
        types.push(packet_type);
    }

    // the RND flag flip on packet 6 needs the dynamic chain
    assert_eq!(RohcPacketType::IrDyn, types[5]);
    // afterwards type-2 packets without IP-ID LSB bits suffice
    assert_eq!(RohcPacketType::Uor2, types[6]);
    assert!(types[7..]
        .iter()
        .all(|&t| matches!(t, RohcPacketType::Uor2 | RohcPacketType::Uo0)));
}

#[test]
fn rtp_detection_by_port_list() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    comp.enable_profile(ProfileId::Rtp).unwrap();
    comp.enable_profile(ProfileId::Udp).unwrap();
    comp.add_rtp_port(5004).unwrap();

    let mut out = [0u8; 512];

    // UDP flow to the registered port binds to the RTP profile
    let rtp_flow = rtp_packet(1, 5004, 100, 16000, &[0; 16]);
    comp.compress(Duration::from_secs(0), &rtp_flow, &mut out)
        .unwrap();
    assert_eq!(ProfileId::Rtp, comp.last_packet_info().unwrap().profile_id);

    // the same payload to another port stays plain UDP
    let udp_flow = rtp_packet(1, 5005, 100, 16000, &[0; 16]);
    comp.compress(Duration::from_secs(1), &udp_flow, &mut out)
        .unwrap();
    assert_eq!(ProfileId::Udp, comp.last_packet_info().unwrap().profile_id);
}

#[test]
fn rtp_flow_settles_into_single_byte_packets() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    comp.enable_profile(ProfileId::Rtp).unwrap();
    comp.add_rtp_port(5004).unwrap();

    let mut types = Vec::new();
    for i in 0..12u16 {
        // constant IP-ID, RTP SN +1 and a constant TS stride of 160
        let packet = rtp_packet(7, 5004, 500 + i, 8000 + 160 * u32::from(i), &[0; 16]);
        let (_, packet_type) = compress_and_type(&mut comp, u64::from(i), &packet);
        types.push(packet_type);
    }
    assert!(types[..3].iter().all(|&t| t == RohcPacketType::Ir));
    // once the stride is announced only SN bits travel
    assert!(types[7..].iter().all(|&t| t == RohcPacketType::Uo0));
    assert_eq!(1, comp.last_packet_info().unwrap().header_compressed_size);
}

#[test]
fn rtp_detection_by_callback() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    comp.enable_profile(ProfileId::Rtp).unwrap();
    comp.enable_profile(ProfileId::Udp).unwrap();
    comp.set_rtp_detection_callback(Some(Box::new(|info| info.destination_port == 9000)));

    let mut out = [0u8; 512];
    let flow = rtp_packet(1, 9000, 100, 16000, &[0; 16]);
    comp.compress(Duration::from_secs(0), &flow, &mut out)
        .unwrap();
    assert_eq!(ProfileId::Rtp, comp.last_packet_info().unwrap().profile_id);
}

#[test]
fn separate_flows_get_separate_contexts() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    comp.enable_profile(ProfileId::Udp).unwrap();

    let mut out = [0u8; 512];
    let flow_a = ipv4_udp_packet(1, 1000, 2000, &[1, 2]);
    let flow_b = ipv4_udp_packet(1, 1000, 2001, &[1, 2]);
    comp.compress(Duration::from_secs(0), &flow_a, &mut out)
        .unwrap();
    comp.compress(Duration::from_secs(1), &flow_b, &mut out)
        .unwrap();
    assert_eq!(2, comp.general_info().contexts_used);
    assert_eq!(1, comp.last_packet_info().unwrap().cid);

    // a later packet of flow A finds its context again
    comp.compress(Duration::from_secs(2), &flow_a, &mut out)
        .unwrap();
    assert_eq!(0, comp.last_packet_info().unwrap().cid);
    assert_eq!(2, comp.general_info().contexts_used);
}

#[test]
fn lru_context_is_recycled_when_the_table_is_full() {
    let mut comp = Compressor::new(CidType::Small, 1).unwrap();
    comp.enable_profile(ProfileId::Udp).unwrap();

    let mut out = [0u8; 512];
    for (i, dst_port) in [2000u16, 2001, 2002].iter().enumerate() {
        let packet = ipv4_udp_packet(1, 1000, *dst_port, &[]);
        comp.compress(Duration::from_secs(i as u64), &packet, &mut out)
            .unwrap();
    }
    // two slots only: the oldest flow (port 2000) was evicted
    assert_eq!(2, comp.general_info().contexts_used);
    assert_eq!(0, comp.last_packet_info().unwrap().cid);
}

#[test]
fn uncompressed_profile_passes_packets_through() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    comp.enable_profile(ProfileId::Uncompressed).unwrap();

    let packet = ipv4_udp_packet(9, 1, 2, &[0xaa; 4]);
    let mut out = [0u8; 512];

    // IR phase: type octet, profile octet, CRC + the whole packet
    for i in 0..3u64 {
        let result = comp
            .compress(Duration::from_secs(i), &packet, &mut out)
            .unwrap();
        assert_eq!(
            CompressResult::Packet {
                len: 3 + packet.len()
            },
            result
        );
        assert_eq!(RohcPacketType::Ir, comp.last_packet_info().unwrap().packet_type);
    }

    // then Normal packets: the packet passes through unchanged
    let result = comp
        .compress(Duration::from_secs(3), &packet, &mut out)
        .unwrap();
    assert_eq!(
        CompressResult::Packet { len: packet.len() },
        result
    );
    assert_eq!(
        RohcPacketType::Normal,
        comp.last_packet_info().unwrap().packet_type
    );
    assert_eq!(&packet[..], &out[..packet.len()]);
}

#[test]
fn no_enabled_profile_is_an_error() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    let packet = ipv4_udp_packet(9, 1, 2, &[]);
    let mut out = [0u8; 512];
    assert!(comp
        .compress(Duration::from_secs(0), &packet, &mut out)
        .is_err());
}

#[test]
fn context_info_reports_per_flow_statistics() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    comp.enable_profile(ProfileId::Ip).unwrap();

    let packet = ipv4_udp_packet(0x0042, 1234, 4321, &[]);
    for i in 0..5u64 {
        compress_and_type(&mut comp, i, &packet);
    }

    let info = comp.context_info(0).unwrap();
    assert_eq!(0, info.cid);
    assert_eq!(ProfileId::Ip, info.profile_id);
    assert_eq!(5, info.packets_sent);
    assert_eq!(3, info.ir_sent);
    assert!(info.total_compressed_bytes < info.total_uncompressed_bytes);
    assert!(info.compressed_bytes_last_16 < info.uncompressed_bytes_last_16);
    assert!(comp.context_info(9).is_none());
}

#[test]
fn force_contexts_reinit_restarts_the_ir_phase() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    comp.enable_profile(ProfileId::Ip).unwrap();

    let packet = ipv4_udp_packet(0x0042, 1234, 4321, &[]);
    for i in 0..8u64 {
        compress_and_type(&mut comp, i, &packet);
    }
    assert_eq!(
        RohcPacketType::Uo0,
        comp.last_packet_info().unwrap().packet_type
    );

    comp.force_contexts_reinit();
    let (_, packet_type) = compress_and_type(&mut comp, 9, &packet);
    assert_eq!(RohcPacketType::Ir, packet_type);
}
