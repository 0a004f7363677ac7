use super::ParseError;

/// Error when compressing a packet.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum CompressError {
    /// Error when the uncompressed packet could not be parsed.
    Malformed(ParseError),

    /// Error when no enabled profile matched the packet (this includes
    /// the Uncompressed profile being disabled).
    NoMatchingProfile,

    /// Error when even the smallest possible ROHC packet does not fit
    /// the output buffer and segmentation is not allowed to take over.
    OutputTooSmall {
        /// Bytes the ROHC packet would have needed.
        required_len: usize,
        /// Bytes the output buffer offered.
        len: usize,
        /// The configured MRRU (0 when segmentation is disabled).
        mrru: usize,
    },

    /// Error when the selected profile and the Uncompressed fallback
    /// both failed to encode the packet.
    InternalEncode {
        /// IANA number of the profile that was selected first.
        profile_id: u16,
    },
}

impl core::fmt::Display for CompressError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use CompressError::*;
        match self {
            Malformed(err) => err.fmt(f),
            NoMatchingProfile => write!(
                f,
                "Compression Error: No enabled profile matched the packet."
            ),
            OutputTooSmall { required_len, len, mrru } => write!(
                f,
                "Compression Error: The ROHC packet needs {} bytes but the output buffer holds only {} bytes and segmentation can not be used (MRRU = {}).",
                required_len, len, mrru
            ),
            InternalEncode { profile_id } => write!(
                f,
                "Compression Error: Profile '0x{:04x}' failed to encode the packet and the Uncompressed fallback failed as well.",
                profile_id
            ),
        }
    }
}

impl std::error::Error for CompressError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use CompressError::*;
        match self {
            Malformed(err) => Some(err),
            NoMatchingProfile | OutputTooSmall { .. } | InternalEncode { .. } => None,
        }
    }
}

impl From<ParseError> for CompressError {
    fn from(err: ParseError) -> CompressError {
        CompressError::Malformed(err)
    }
}
