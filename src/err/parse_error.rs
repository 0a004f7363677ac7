use super::Layer;

/// Error when the uncompressed packet handed to the compressor could
/// not be parsed up to the header boundary.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ParseError {
    /// Error when the IP version nibble is neither 4 nor 6.
    UnsupportedIpVersion {
        /// The version nibble found in the first byte.
        version_number: u8,
    },

    /// Error when a header declares or requires more bytes than the
    /// packet slice contains.
    LenTooSmall {
        /// Minimum number of bytes required by the header.
        required_len: usize,
        /// Number of bytes actually available.
        len: usize,
        /// Layer in which the length ran out.
        layer: Layer,
    },

    /// Error when the IPv4 "internet header length" field is smaller
    /// than the header itself.
    Ipv4IhlTooSmall {
        /// The internet header length value that was too small.
        ihl: u8,
    },

    /// Error when the IPv4 total length field is smaller than the
    /// header length it has to include.
    Ipv4TotalLenTooSmall {
        /// The total length value present in the header.
        total_len: u16,
        /// The length of the IPv4 header (including options).
        header_len: u16,
    },
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use ParseError::*;
        match self {
            UnsupportedIpVersion { version_number } => write!(
                f,
                "Parse Error: Encountered '{}' as IP version number (only '4' and '6' are supported).",
                version_number
            ),
            LenTooSmall { required_len, len, layer } => write!(
                f,
                "Parse Error: The {} requires at least {} bytes, but only {} bytes were available.",
                layer, required_len, len
            ),
            Ipv4IhlTooSmall { ihl } => write!(
                f,
                "Parse Error: The IPv4 'internet header length' value '{}' is smaller than the minimum of 5.",
                ihl
            ),
            Ipv4TotalLenTooSmall { total_len, header_len } => write!(
                f,
                "Parse Error: The IPv4 'total length' value '{}' is smaller than the header length '{}'.",
                total_len, header_len
            ),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

#[cfg(test)]
mod test {
    use super::{ParseError::*, *};
    use std::error::Error;

    #[test]
    fn debug() {
        assert_eq!(
            "UnsupportedIpVersion { version_number: 5 }",
            format!("{:?}", UnsupportedIpVersion { version_number: 5 })
        );
    }

    #[test]
    fn clone_eq() {
        let err = Ipv4IhlTooSmall { ihl: 2 };
        assert_eq!(err, err.clone());
    }

    #[test]
    fn fmt() {
        assert_eq!(
            "Parse Error: Encountered '5' as IP version number (only '4' and '6' are supported).",
            format!("{}", UnsupportedIpVersion { version_number: 5 })
        );
        assert_eq!(
            "Parse Error: The UDP header requires at least 8 bytes, but only 4 bytes were available.",
            format!(
                "{}",
                LenTooSmall {
                    required_len: 8,
                    len: 4,
                    layer: Layer::UdpHeader
                }
            )
        );
        assert_eq!(
            "Parse Error: The IPv4 'total length' value '10' is smaller than the header length '20'.",
            format!(
                "{}",
                Ipv4TotalLenTooSmall {
                    total_len: 10,
                    header_len: 20
                }
            )
        );
    }

    #[test]
    fn source() {
        assert!(UnsupportedIpVersion { version_number: 0 }.source().is_none());
        assert!(Ipv4IhlTooSmall { ihl: 0 }.source().is_none());
    }
}
