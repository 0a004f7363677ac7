use crate::err::{Layer, ParseError};

/// A slice containing an RTP header (fixed part and CSRC list).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RtpSlice<'a> {
    slice: &'a [u8],
}

impl<'a> RtpSlice<'a> {
    /// Length of the fixed RTP header part in bytes.
    pub const MIN_LEN: usize = 12;

    /// Creates a view of the RTP header at the start of the slice.
    ///
    /// The header extension announced by the X bit is not part of the
    /// view; it travels as payload.
    pub fn from_slice(slice: &'a [u8], layer: Layer) -> Result<RtpSlice<'a>, ParseError> {
        if slice.len() < RtpSlice::MIN_LEN {
            return Err(ParseError::LenTooSmall {
                required_len: RtpSlice::MIN_LEN,
                len: slice.len(),
                layer,
            });
        }
        let header_len = RtpSlice::MIN_LEN + usize::from(slice[0] & 0xf) * 4;
        if slice.len() < header_len {
            return Err(ParseError::LenTooSmall {
                required_len: header_len,
                len: slice.len(),
                layer,
            });
        }
        Ok(RtpSlice {
            slice: &slice[..header_len],
        })
    }

    /// The slice covering fixed header and CSRC list.
    #[inline]
    pub fn slice(&self) -> &'a [u8] {
        self.slice
    }

    /// Length of fixed header plus CSRC list.
    #[inline]
    pub fn header_len(&self) -> usize {
        self.slice.len()
    }

    /// The RTP version (2 for all traffic worth compressing).
    #[inline]
    pub fn version(&self) -> u8 {
        self.slice[0] >> 6
    }

    /// The padding flag.
    #[inline]
    pub fn padding(&self) -> bool {
        self.slice[0] & 0x20 != 0
    }

    /// The header extension flag.
    #[inline]
    pub fn extension(&self) -> bool {
        self.slice[0] & 0x10 != 0
    }

    /// Number of CSRC entries.
    #[inline]
    pub fn csrc_count(&self) -> u8 {
        self.slice[0] & 0xf
    }

    /// The marker bit.
    #[inline]
    pub fn marker(&self) -> bool {
        self.slice[1] & 0x80 != 0
    }

    /// The payload type.
    #[inline]
    pub fn payload_type(&self) -> u8 {
        self.slice[1] & 0x7f
    }

    /// The RTP sequence number.
    #[inline]
    pub fn sequence_number(&self) -> u16 {
        u16::from_be_bytes([self.slice[2], self.slice[3]])
    }

    /// The RTP timestamp.
    #[inline]
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.slice[4], self.slice[5], self.slice[6], self.slice[7]])
    }

    /// The synchronisation source identifier.
    #[inline]
    pub fn ssrc(&self) -> u32 {
        u32::from_be_bytes([self.slice[8], self.slice[9], self.slice[10], self.slice[11]])
    }
}
