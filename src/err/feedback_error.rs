use super::SdvlError;

/// Error when queueing or delivering feedback data.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum FeedbackError {
    /// Error when the piggyback ring has no free slot left (the new
    /// feedback is dropped, queued ones are kept).
    QueueFull,

    /// Error when feedback data is empty or ends before the announced
    /// content.
    TooShort {
        /// Bytes at least required.
        required_len: usize,
        /// Bytes available.
        len: usize,
    },

    /// Error when the large CID at the start of delivered feedback
    /// could not be decoded.
    LargeCid(SdvlError),

    /// Error when the CID of delivered feedback names no live context.
    UnknownCid {
        /// The context ID that was not found.
        cid: u16,
    },
}

impl core::fmt::Display for FeedbackError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use FeedbackError::*;
        match self {
            QueueFull => write!(
                f,
                "Feedback Error: The piggyback ring is full, the feedback was dropped."
            ),
            TooShort { required_len, len } => write!(
                f,
                "Feedback Error: At least {} bytes of feedback data are required, but only {} bytes were given.",
                required_len, len
            ),
            LargeCid(err) => write!(f, "Feedback Error: Bad large CID field: {}", err),
            UnknownCid { cid } => write!(
                f,
                "Feedback Error: No context with CID '{}' exists at the compressor.",
                cid
            ),
        }
    }
}

impl std::error::Error for FeedbackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use FeedbackError::*;
        match self {
            LargeCid(err) => Some(err),
            QueueFull | TooShort { .. } | UnknownCid { .. } => None,
        }
    }
}

impl From<SdvlError> for FeedbackError {
    fn from(err: SdvlError) -> FeedbackError {
        FeedbackError::LargeCid(err)
    }
}

#[cfg(test)]
mod test {
    use super::{FeedbackError::*, *};
    use std::error::Error;

    #[test]
    fn debug_clone_eq() {
        let err = UnknownCid { cid: 3 };
        assert_eq!(err, err.clone());
        assert_eq!("QueueFull", format!("{:?}", QueueFull));
    }

    #[test]
    fn fmt() {
        assert_eq!(
            "Feedback Error: The piggyback ring is full, the feedback was dropped.",
            format!("{}", QueueFull)
        );
        assert_eq!(
            "Feedback Error: No context with CID '7' exists at the compressor.",
            format!("{}", UnknownCid { cid: 7 })
        );
    }

    #[test]
    fn source() {
        assert!(QueueFull.source().is_none());
        assert!(LargeCid(SdvlError::UnexpectedEnd {
            expected_len: 2,
            len: 1
        })
        .source()
        .is_some());
    }
}
