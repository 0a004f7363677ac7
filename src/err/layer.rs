/// Layers on which length errors can occur while walking an
/// uncompressed packet.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Layer {
    /// Error occurred in the outer or only IPv4 header.
    Ipv4Header,
    /// Error occurred in the outer or only IPv6 header.
    Ipv6Header,
    /// Error occurred in an IPv6 extension header.
    Ipv6ExtHeader,
    /// Error occurred in the tunneled (inner) IP header.
    InnerIpHeader,
    /// Error occurred in the UDP header.
    UdpHeader,
    /// Error occurred in the UDP-Lite header.
    UdpLiteHeader,
    /// Error occurred in the RTP header.
    RtpHeader,
}

impl Layer {
    /// String describing the layer in error messages.
    pub fn error_title(&self) -> &'static str {
        use Layer::*;
        match self {
            Ipv4Header => "IPv4 header",
            Ipv6Header => "IPv6 header",
            Ipv6ExtHeader => "IPv6 extension header",
            InnerIpHeader => "inner IP header",
            UdpHeader => "UDP header",
            UdpLiteHeader => "UDP-Lite header",
            RtpHeader => "RTP header",
        }
    }
}

impl core::fmt::Display for Layer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.error_title())
    }
}
