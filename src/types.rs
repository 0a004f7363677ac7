/// Flavour of context IDs used on a ROHC channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CidType {
    /// CIDs in the range `[0, 15]`, carried in an add-CID octet.
    Small,
    /// CIDs in the range `[0, 65535]`, carried as an SDVL field.
    Large,
}

impl CidType {
    /// The largest CID the flavour can express.
    #[inline]
    pub fn max_cid(&self) -> u16 {
        match self {
            CidType::Small => 15,
            CidType::Large => u16::MAX,
        }
    }
}

/// Operation modes of a ROHC flow (RFC 3095, §4.4).
///
/// The compressor starts every flow in unidirectional mode and moves to
/// bidirectional optimistic mode on the first acknowledgment. The
/// reliable mode is not implemented.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum OperatingMode {
    /// Unidirectional mode (U-mode).
    Unidirectional,
    /// Bidirectional optimistic mode (O-mode).
    Optimistic,
    /// Bidirectional reliable mode (R-mode), declared but not used.
    Reliable,
}

impl OperatingMode {
    /// The 2 bit mode value used on the wire.
    #[inline]
    pub(crate) fn wire_value(&self) -> u8 {
        match self {
            OperatingMode::Unidirectional => 1,
            OperatingMode::Optimistic => 2,
            OperatingMode::Reliable => 3,
        }
    }
}

impl core::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OperatingMode::Unidirectional => write!(f, "U-mode"),
            OperatingMode::Optimistic => write!(f, "O-mode"),
            OperatingMode::Reliable => write!(f, "R-mode"),
        }
    }
}

/// Compression states of a context (RFC 3095, §4.3.1).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ContextState {
    /// Initialization & Refresh: full headers are sent.
    Ir,
    /// First Order: differences to the static chain are established.
    Fo,
    /// Second Order: only the sequence number (and fields inferred from
    /// it) change.
    So,
}

impl core::fmt::Display for ContextState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ContextState::Ir => write!(f, "IR"),
            ContextState::Fo => write!(f, "FO"),
            ContextState::So => write!(f, "SO"),
        }
    }
}

/// Importance of a message handed to the trace callback.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TraceLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Callback receiving human readable traces from the compressor.
pub type TraceCallback = Box<dyn Fn(TraceLevel, &str)>;

/// Callback providing random numbers (used to initialize the SN of new
/// non-RTP flows, RFC 3095 §5.11.1).
pub type RandomCallback = Box<dyn Fn() -> u32>;

/// Information handed to the RTP detection callback for every UDP
/// packet that is about to be compressed.
#[derive(Copy, Clone, Debug)]
pub struct RtpDetectInfo<'a> {
    /// UDP source port of the packet.
    pub source_port: u16,
    /// UDP destination port of the packet.
    pub destination_port: u16,
    /// Bytes following the UDP header.
    pub payload: &'a [u8],
}

/// Callback deciding whether a UDP packet belongs to an RTP stream.
pub type RtpDetectCallback = Box<dyn Fn(&RtpDetectInfo<'_>) -> bool>;
