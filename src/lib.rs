//! A library implementing the compression side of RObust Header
//! Compression (ROHC) as defined in RFC 3095, RFC 3843 and RFC 4019.
//!
//! ROHC shrinks the IP/UDP/RTP header stack of a packet flow from tens
//! of bytes down to one to three bytes for the common case, by keeping
//! per-flow state (a "context") on both sides of a link and only
//! transmitting what changed. It was designed for lossy, bandwidth
//! limited links (cellular, satellite, PPP) and trades a small amount
//! of memory per flow for substantial over-the-air savings.
//!
//! Currently supported are the compression profiles:
//! * Uncompressed (0x0000)
//! * RTP (0x0001)
//! * UDP (0x0002)
//! * IP-only (0x0004)
//! * UDP-Lite (0x0008)
//!
//! # Usage
//!
//! Create a [`Compressor`] per channel, enable the profiles the peer
//! supports and feed it packets:
//!
//! ```
//! use rohc_comp::{CidType, Compressor, CompressResult, ProfileId};
//! use core::time::Duration;
//!
//! let mut comp = Compressor::new(CidType::Small, 15).unwrap();
//! comp.enable_profile(ProfileId::Udp).unwrap();
//! comp.enable_profile(ProfileId::Ip).unwrap();
//! comp.enable_profile(ProfileId::Uncompressed).unwrap();
//!
//! // an IPv4/UDP packet with 4 payload bytes
//! let mut packet = vec![
//!     0x45u8, 0x00, 0x00, 0x20, 0x00, 0x01, 0x40, 0x00,
//!     0x40, 17, 0x00, 0x00, 10, 0, 0, 1, 10, 0, 0, 2,
//! ];
//! packet.extend([0x13, 0x8c, 0x13, 0x8c, 0x00, 0x0c, 0x00, 0x00]);
//! packet.extend([1, 2, 3, 4]);
//!
//! let mut rohc = [0u8; 256];
//! match comp.compress(Duration::from_secs(0), &packet, &mut rohc) {
//!     Ok(CompressResult::Packet { len }) => {
//!         println!("compressed to {} bytes", len);
//!     }
//!     Ok(CompressResult::Segment) => {
//!         // retrieve the parts with comp.get_segment(...)
//!     }
//!     Err(err) => println!("compression failed: {}", err),
//! }
//! ```
//!
//! The matching decompressor is a separate component; only its
//! feedback interface is part of this crate
//! ([`Compressor::deliver_feedback`], [`Compressor::piggyback_feedback`]
//! and friends).
//!
//! # What is not covered?
//!
//! * the Bidirectional Reliable mode (R-mode) and its packet formats
//! * compressed IPv4 extension header lists
//! * ESP, GRE and AH header compression (the ESP and TCP profile
//!   numbers are declared but not implemented)
//! * timer based RTP timestamp compression
//! * more than two nested IP headers

mod compressor;
mod context;
mod crc;
mod encodings;
pub mod err;
mod feedback;
mod packet;
mod packet_type;
mod profile_id;
mod profiles;
mod rfc3095;
mod segment;
mod stats;
mod types;

pub use compressor::{
    CompressResult, Compressor, ContextInfo, GeneralInfo, LastPacketInfo, SegmentResult,
    DEFAULT_FO_TIMEOUT, DEFAULT_IR_TIMEOUT, DEFAULT_PIGGYBACK_BUDGET,
    DEFAULT_WLSB_WINDOW_WIDTH,
};
pub use crc::{
    CrcTables, CRC_INIT_2, CRC_INIT_3, CRC_INIT_6, CRC_INIT_7, CRC_INIT_8, CRC_INIT_FCS32,
    FCS32_LEN,
};
pub use encodings::{sdvl_decode, sdvl_encode, sdvl_encoded_len, SDVL_MAX_VALUE};
pub use packet::{
    IpSlice, Ipv4Slice, Ipv6Slice, ParsedPacket, RtpSlice, UdpSlice, IP_NUMBER_AUTH,
    IP_NUMBER_ESP, IP_NUMBER_IPV6, IP_NUMBER_IPV6_DEST_OPTIONS, IP_NUMBER_IPV6_FRAGMENT,
    IP_NUMBER_IPV6_HOP_BY_HOP, IP_NUMBER_IPV6_ROUTING, IP_NUMBER_IP_IN_IP, IP_NUMBER_TCP,
    IP_NUMBER_UDP, IP_NUMBER_UDPLITE,
};
pub use packet_type::RohcPacketType;
pub use profile_id::ProfileId;
pub use types::{
    CidType, ContextState, OperatingMode, RandomCallback, RtpDetectCallback, RtpDetectInfo,
    TraceCallback, TraceLevel,
};
