/// Error when retrieving a segment of a staged ROHC packet.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum SegmentError {
    /// Error when no reconstructed reception unit is staged (the last
    /// `compress` call did not return the segmentation status).
    NoStagedUnit,

    /// Error when the output buffer can not even hold the segment
    /// header plus one payload byte.
    BufferTooSmall {
        /// Bytes at least required.
        required_len: usize,
        /// Bytes the buffer offered.
        len: usize,
    },
}

impl core::fmt::Display for SegmentError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use SegmentError::*;
        match self {
            NoStagedUnit => write!(
                f,
                "Segmentation Error: No reconstructed reception unit is staged at the compressor."
            ),
            BufferTooSmall { required_len, len } => write!(
                f,
                "Segmentation Error: The output buffer holds {} bytes but at least {} bytes are required for a segment.",
                len, required_len
            ),
        }
    }
}

impl std::error::Error for SegmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

#[cfg(test)]
mod test {
    use super::SegmentError::*;
    use std::error::Error;

    #[test]
    fn debug_clone_eq() {
        let err = NoStagedUnit;
        assert_eq!(err, err.clone());
        assert_eq!("NoStagedUnit", format!("{:?}", NoStagedUnit));
    }

    #[test]
    fn fmt() {
        assert_eq!(
            "Segmentation Error: No reconstructed reception unit is staged at the compressor.",
            format!("{}", NoStagedUnit)
        );
        assert_eq!(
            "Segmentation Error: The output buffer holds 1 bytes but at least 2 bytes are required for a segment.",
            format!("{}", BufferTooSmall { required_len: 2, len: 1 })
        );
    }

    #[test]
    fn source() {
        assert!(NoStagedUnit.source().is_none());
    }
}
