use crate::err::{Layer, ParseError};
use crate::packet::ip_number::*;
use crate::packet::{Ipv4Slice, Ipv6Slice, UdpSlice};

/// Either of the two IP header views.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IpSlice<'a> {
    V4(Ipv4Slice<'a>),
    V6(Ipv6Slice<'a>),
}

impl<'a> IpSlice<'a> {
    fn from_slice(slice: &'a [u8], layer: Option<Layer>) -> Result<IpSlice<'a>, ParseError> {
        if slice.is_empty() {
            return Err(ParseError::LenTooSmall {
                required_len: 1,
                len: 0,
                layer: layer.unwrap_or(Layer::Ipv4Header),
            });
        }
        match slice[0] >> 4 {
            4 => Ok(IpSlice::V4(Ipv4Slice::from_slice(
                slice,
                layer.unwrap_or(Layer::Ipv4Header),
            )?)),
            6 => Ok(IpSlice::V6(Ipv6Slice::from_slice(
                slice,
                layer.unwrap_or(Layer::Ipv6Header),
            )?)),
            version_number => Err(ParseError::UnsupportedIpVersion { version_number }),
        }
    }

    /// IP version of the header (4 or 6).
    #[inline]
    pub fn version(&self) -> u8 {
        match self {
            IpSlice::V4(_) => 4,
            IpSlice::V6(_) => 6,
        }
    }

    /// Offset of the next protocol behind this IP header (base header,
    /// options and extension chain).
    #[inline]
    pub fn header_span(&self) -> usize {
        match self {
            IpSlice::V4(v4) => v4.header_len(),
            IpSlice::V6(v6) => v6.header_span(),
        }
    }

    /// Protocol number of the header following this IP header (after
    /// the IPv6 extension chain, if any).
    #[inline]
    pub fn transport_protocol(&self) -> u8 {
        match self {
            IpSlice::V4(v4) => v4.protocol(),
            IpSlice::V6(v6) => v6.transport_protocol(),
        }
    }

    /// Total length of this IP packet (declared header + payload).
    #[inline]
    pub fn total_len(&self) -> usize {
        match self {
            IpSlice::V4(v4) => usize::from(v4.total_len()),
            IpSlice::V6(v6) => v6.total_len(),
        }
    }

    /// The TOS byte (IPv4) or traffic class (IPv6).
    #[inline]
    pub fn tos_or_traffic_class(&self) -> u8 {
        match self {
            IpSlice::V4(v4) => v4.tos(),
            IpSlice::V6(v6) => v6.traffic_class(),
        }
    }

    /// The TTL (IPv4) or hop limit (IPv6).
    #[inline]
    pub fn ttl_or_hop_limit(&self) -> u8 {
        match self {
            IpSlice::V4(v4) => v4.ttl(),
            IpSlice::V6(v6) => v6.hop_limit(),
        }
    }

    pub fn v4(&self) -> Option<&Ipv4Slice<'a>> {
        match self {
            IpSlice::V4(v4) => Some(v4),
            IpSlice::V6(_) => None,
        }
    }

    pub fn v6(&self) -> Option<&Ipv6Slice<'a>> {
        match self {
            IpSlice::V6(v6) => Some(v6),
            IpSlice::V4(_) => None,
        }
    }
}

/// An uncompressed packet walked up to its transport header.
///
/// At most two IP headers are parsed; a tunnel below the second IP
/// header is treated as opaque payload.
#[derive(Copy, Clone, Debug)]
pub struct ParsedPacket<'a> {
    data: &'a [u8],
    outer: IpSlice<'a>,
    inner: Option<IpSlice<'a>>,
    /// Protocol number behind the innermost parsed IP header.
    transport_protocol: u8,
    /// Offset of that protocol's header inside `data`.
    transport_offset: usize,
}

impl<'a> ParsedPacket<'a> {
    /// Parses the given bytes as an IPv4 or IPv6 packet.
    pub fn from_slice(data: &'a [u8]) -> Result<ParsedPacket<'a>, ParseError> {
        let outer = IpSlice::from_slice(data, None)?;
        let mut transport_protocol = outer.transport_protocol();
        let mut transport_offset = outer.header_span();
        let inner = if is_tunneled_ip(transport_protocol) {
            let inner = IpSlice::from_slice(
                &data[transport_offset..outer.total_len()],
                Some(Layer::InnerIpHeader),
            )?;
            transport_protocol = inner.transport_protocol();
            transport_offset += inner.header_span();
            Some(inner)
        } else {
            None
        };
        Ok(ParsedPacket {
            data,
            outer,
            inner,
            transport_protocol,
            transport_offset,
        })
    }

    /// The raw packet bytes the views borrow from.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The outer (or only) IP header.
    #[inline]
    pub fn outer(&self) -> &IpSlice<'a> {
        &self.outer
    }

    /// The tunneled IP header, if the packet carries one.
    #[inline]
    pub fn inner(&self) -> Option<&IpSlice<'a>> {
        self.inner.as_ref()
    }

    /// The innermost parsed IP header.
    #[inline]
    pub fn innermost(&self) -> &IpSlice<'a> {
        self.inner.as_ref().unwrap_or(&self.outer)
    }

    /// Protocol number behind the innermost parsed IP header.
    #[inline]
    pub fn transport_protocol(&self) -> u8 {
        self.transport_protocol
    }

    /// Offset of the transport header inside the packet.
    #[inline]
    pub fn transport_offset(&self) -> usize {
        self.transport_offset
    }

    /// Declared length of the whole packet (trailing link padding is
    /// not included).
    #[inline]
    pub fn total_len(&self) -> usize {
        self.outer.total_len()
    }

    /// View of the UDP(-Lite) header at the transport offset.
    pub fn udp(&self) -> Result<UdpSlice<'a>, ParseError> {
        let layer = if self.transport_protocol == IP_NUMBER_UDPLITE {
            Layer::UdpLiteHeader
        } else {
            Layer::UdpHeader
        };
        UdpSlice::from_slice(&self.data[self.transport_offset..self.total_len()], layer)
    }

    /// The bytes behind the transport header start.
    #[inline]
    pub fn from_transport(&self) -> &'a [u8] {
        &self.data[self.transport_offset..self.total_len()]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    pub(crate) fn ipv4_udp_packet(payload_len: usize) -> Vec<u8> {
        let total = 20 + 8 + payload_len;
        let mut bytes = vec![
            0x45,
            0x00,
            (total >> 8) as u8,
            total as u8,
            0x00,
            0x01,
            0x40,
            0x00,
            0x40,
            IP_NUMBER_UDP,
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
            0x00,
            0x00,
        ]);
        bytes.extend(core::iter::repeat(0xab).take(payload_len));
        bytes
    }

    #[test]
    fn single_ip_header() {
        let bytes = ipv4_udp_packet(4);
        let parsed = ParsedPacket::from_slice(&bytes).unwrap();
        assert_eq!(4, parsed.outer().version());
        assert!(parsed.inner().is_none());
        assert_eq!(IP_NUMBER_UDP, parsed.transport_protocol());
        assert_eq!(20, parsed.transport_offset());
        assert_eq!(5004, parsed.udp().unwrap().source_port());
    }

    #[test]
    fn two_ip_headers() {
        let inner = ipv4_udp_packet(0);
        let total = 20 + inner.len();
        let mut bytes = vec![
            0x45,
            0x00,
            (total >> 8) as u8,
            total as u8,
            0x00,
            0x01,
            0x40,
            0x00,
            0x40,
            IP_NUMBER_IP_IN_IP,
            0x00,
            0x00,
            192,
            0,
            2,
            1,
            192,
            0,
            2,
            2,
        ];
        bytes.extend(&inner);
        let parsed = ParsedPacket::from_slice(&bytes).unwrap();
        assert!(parsed.inner().is_some());
        assert_eq!(IP_NUMBER_UDP, parsed.transport_protocol());
        assert_eq!(40, parsed.transport_offset());
        assert_eq!(4, parsed.innermost().version());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(ParsedPacket::from_slice(&[0x15, 0x00]).is_err());
        assert!(ParsedPacket::from_slice(&[]).is_err());
    }
}
