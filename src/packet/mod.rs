//! Views over the uncompressed IPv4/IPv6/UDP/UDP-Lite/RTP headers the
//! compressor works on.
//!
//! The views borrow the packet bytes and only check lengths and version
//! fields up front; individual fields are read on demand.

mod ip_number;
mod ipv4_slice;
mod ipv6_slice;
mod parsed_packet;
mod rtp_slice;
mod udp_slice;

pub use ip_number::*;
pub use ipv4_slice::Ipv4Slice;
pub use ipv6_slice::Ipv6Slice;
pub use parsed_packet::{IpSlice, ParsedPacket};
pub use rtp_slice::RtpSlice;
pub use udp_slice::UdpSlice;
