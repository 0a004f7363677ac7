/// Kinds of ROHC packets the compressor can emit.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RohcPacketType {
    /// IR packet: static and dynamic chain (RFC 3095, §5.7.7.1).
    Ir,
    /// IR-DYN packet: dynamic chain only (RFC 3095, §5.7.7.2).
    IrDyn,
    /// UO-0 packet (RFC 3095, §5.7.1).
    Uo0,
    /// UO-1 packet (RFC 3095, §5.7.3).
    Uo1,
    /// UO-1-ID packet of the RTP profile.
    Uo1Id,
    /// UO-1-TS packet of the RTP profile.
    Uo1Ts,
    /// UOR-2 packet (RFC 3095, §5.7.4).
    Uor2,
    /// UOR-2-ID packet of the RTP profile.
    Uor2Id,
    /// UOR-2-TS packet of the RTP profile.
    Uor2Ts,
    /// Normal packet of the Uncompressed profile (RFC 3095, §5.10.2).
    Normal,
}

impl RohcPacketType {
    /// True for the two packet kinds that carry the dynamic chain.
    #[inline]
    pub fn has_dynamic_chain(&self) -> bool {
        matches!(self, RohcPacketType::Ir | RohcPacketType::IrDyn)
    }
}

impl core::fmt::Display for RohcPacketType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use RohcPacketType::*;
        match self {
            Ir => write!(f, "IR"),
            IrDyn => write!(f, "IR-DYN"),
            Uo0 => write!(f, "UO-0"),
            Uo1 => write!(f, "UO-1"),
            Uo1Id => write!(f, "UO-1-ID"),
            Uo1Ts => write!(f, "UO-1-TS"),
            Uor2 => write!(f, "UOR-2"),
            Uor2Id => write!(f, "UOR-2-ID"),
            Uor2Ts => write!(f, "UOR-2-TS"),
            Normal => write!(f, "Normal"),
        }
    }
}
