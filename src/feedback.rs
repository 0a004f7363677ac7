//! Piggybacked feedback: the ring queueing feedback data for the next
//! outgoing packets, and the parsing of feedback delivered by the
//! decompressor.

use crate::encodings::sdvl_decode;
use crate::err::{FeedbackError, SdvlError};
use crate::CidType;

/// Number of feedbacks the piggyback ring can queue.
pub(crate) const FEEDBACK_RING_CAPACITY: usize = 1000;

/// Ring of feedback payloads waiting to ride an outgoing packet.
///
/// Draining a feedback into a packet only locks its slot: the slot is
/// freed when the packet is known to be built (`commit_locked`), or
/// unlocked again when packet construction failed or segmentation took
/// over (`unlock_all`). Exactly one of the two closes every drain.
#[derive(Debug)]
pub(crate) struct FeedbackRing {
    slots: Vec<Vec<u8>>,
    /// Index of the oldest stored feedback.
    first: usize,
    /// Stored feedbacks (queued + locked).
    count: usize,
    /// Locked feedbacks, always the `locked` oldest ones.
    locked: usize,
}

impl FeedbackRing {
    pub(crate) fn new() -> FeedbackRing {
        FeedbackRing {
            slots: (0..FEEDBACK_RING_CAPACITY).map(|_| Vec::new()).collect(),
            first: 0,
            count: 0,
            locked: 0,
        }
    }

    /// Queues feedback data, failing (and dropping only the new data)
    /// when the ring is full.
    pub(crate) fn push(&mut self, data: &[u8]) -> Result<(), FeedbackError> {
        if self.count == self.slots.len() {
            return Err(FeedbackError::QueueFull);
        }
        let idx = (self.first + self.count) % self.slots.len();
        self.slots[idx].clear();
        self.slots[idx].extend_from_slice(data);
        self.count += 1;
        Ok(())
    }

    /// Frame length of a feedback payload: the `1110 0...`-style
    /// feedback type octet plus the optional size octet.
    fn framed_len(payload_len: usize) -> usize {
        payload_len + if payload_len < 8 { 1 } else { 2 }
    }

    /// Emits the oldest queued feedback into `dest` (framed) and locks
    /// it. Returns `None` when nothing is queued or the next feedback
    /// does not fit.
    pub(crate) fn drain_one(&mut self, dest: &mut [u8]) -> Option<usize> {
        if self.locked == self.count {
            return None;
        }
        let idx = (self.first + self.locked) % self.slots.len();
        let payload_len = self.slots[idx].len();
        let framed = Self::framed_len(payload_len);
        if framed > dest.len() {
            return None;
        }
        if payload_len < 8 {
            dest[0] = 0xf0 | payload_len as u8;
            dest[1..1 + payload_len].copy_from_slice(&self.slots[idx]);
        } else {
            dest[0] = 0xf0;
            dest[1] = payload_len as u8;
            dest[2..2 + payload_len].copy_from_slice(&self.slots[idx]);
        }
        self.locked += 1;
        Some(framed)
    }

    /// Frees every locked slot (the packet carrying them went out).
    pub(crate) fn commit_locked(&mut self) {
        for i in 0..self.locked {
            let idx = (self.first + i) % self.slots.len();
            self.slots[idx].clear();
        }
        self.first = (self.first + self.locked) % self.slots.len();
        self.count -= self.locked;
        self.locked = 0;
    }

    /// Unlocks every locked slot so the data rides a later packet.
    pub(crate) fn unlock_all(&mut self) {
        self.locked = 0;
    }

    /// Bytes of framed feedback currently queued (locked slots are not
    /// counted, they are part of a packet in flight).
    pub(crate) fn avail_bytes(&self) -> usize {
        (self.locked..self.count)
            .map(|i| {
                let idx = (self.first + i) % self.slots.len();
                Self::framed_len(self.slots[idx].len())
            })
            .sum()
    }

    #[cfg(test)]
    pub(crate) fn locked_count(&self) -> usize {
        self.locked
    }

    #[cfg(test)]
    pub(crate) fn stored_count(&self) -> usize {
        self.count
    }
}

/// Acknowledgment flavour of a FEEDBACK-2 packet.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum FeedbackAck {
    Ack,
    Nack,
    StaticNack,
    /// Reserved acktype value 3, ignored.
    Reserved,
}

/// Decoded feedback delivered by the decompressor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct DeliveredFeedback {
    pub cid: u16,
    pub kind: FeedbackKind,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum FeedbackKind {
    /// FEEDBACK-1: a plain acknowledgment without an SN.
    Feedback1,
    /// FEEDBACK-2 with acktype, mode and the 12 bit SN.
    Feedback2 {
        acktype: FeedbackAck,
        mode: u8,
        sn: u16,
    },
}

/// Decodes the CID and feedback variant of a delivered feedback
/// packet (RFC 3095, §5.2.2).
pub(crate) fn parse_feedback(
    data: &[u8],
    cid_type: CidType,
) -> Result<DeliveredFeedback, FeedbackError> {
    if data.is_empty() {
        return Err(FeedbackError::TooShort {
            required_len: 1,
            len: 0,
        });
    }

    let (cid, consumed) = match cid_type {
        CidType::Large => {
            let (value, len) = sdvl_decode(data)?;
            if value > u32::from(u16::MAX) {
                return Err(FeedbackError::LargeCid(SdvlError::ValueTooLarge { value }));
            }
            (value as u16, len)
        }
        CidType::Small => {
            if data[0] & 0xf0 == 0xe0 {
                (u16::from(data[0] & 0x0f), 1)
            } else {
                (0, 0)
            }
        }
    };

    let rest = &data[consumed..];
    let kind = match rest.len() {
        0 => {
            return Err(FeedbackError::TooShort {
                required_len: consumed + 1,
                len: data.len(),
            })
        }
        1 => FeedbackKind::Feedback1,
        _ => {
            let acktype = match rest[0] >> 6 {
                0 => FeedbackAck::Ack,
                1 => FeedbackAck::Nack,
                2 => FeedbackAck::StaticNack,
                _ => FeedbackAck::Reserved,
            };
            FeedbackKind::Feedback2 {
                acktype,
                mode: (rest[0] >> 4) & 0x03,
                sn: (u16::from(rest[0] & 0x0f) << 8) | u16::from(rest[1]),
            }
        }
    };

    Ok(DeliveredFeedback { cid, kind })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ring_indices_stay_consistent() {
        let mut ring = FeedbackRing::new();
        let mut buf = [0u8; 64];
        ring.push(&[1, 2, 3]).unwrap();
        ring.push(&[4, 5]).unwrap();
        ring.push(&[6]).unwrap();
        assert_eq!(3, ring.stored_count());
        assert_eq!(0, ring.locked_count());

        // drain two, locked trails stored
        assert_eq!(Some(4), ring.drain_one(&mut buf));
        assert_eq!(Some(3), ring.drain_one(&mut buf));
        assert_eq!(2, ring.locked_count());
        assert!(ring.locked_count() <= ring.stored_count());

        // rollback requeues them
        ring.unlock_all();
        assert_eq!(3, ring.stored_count());
        assert_eq!(4 + 3 + 2, ring.avail_bytes());

        // drain + commit removes them
        assert!(ring.drain_one(&mut buf).is_some());
        ring.commit_locked();
        assert_eq!(2, ring.stored_count());
        assert_eq!(0, ring.locked_count());
    }

    #[test]
    fn framing_uses_one_or_two_octets() {
        let mut ring = FeedbackRing::new();
        let mut buf = [0u8; 64];
        ring.push(&[0xaa; 3]).unwrap();
        ring.push(&[0xbb; 9]).unwrap();

        let n = ring.drain_one(&mut buf).unwrap();
        assert_eq!(4, n);
        assert_eq!(0xf3, buf[0]);
        assert_eq!([0xaa; 3], buf[1..4]);

        let n = ring.drain_one(&mut buf).unwrap();
        assert_eq!(11, n);
        assert_eq!(0xf0, buf[0]);
        assert_eq!(9, buf[1]);
    }

    #[test]
    fn drain_respects_the_buffer() {
        let mut ring = FeedbackRing::new();
        ring.push(&[1, 2, 3, 4, 5]).unwrap();
        let mut tiny = [0u8; 4];
        assert_eq!(None, ring.drain_one(&mut tiny));
        assert_eq!(0, ring.locked_count());
    }

    #[test]
    fn full_ring_rejects_new_feedback() {
        let mut ring = FeedbackRing::new();
        for _ in 0..FEEDBACK_RING_CAPACITY {
            ring.push(&[0]).unwrap();
        }
        assert_eq!(Err(FeedbackError::QueueFull), ring.push(&[1]));
        assert_eq!(FEEDBACK_RING_CAPACITY, ring.stored_count());
    }

    #[test]
    fn parse_small_cid_feedback() {
        // no add-CID octet: CID 0
        let fb = parse_feedback(&[0x00], CidType::Small).unwrap();
        assert_eq!(0, fb.cid);
        assert_eq!(FeedbackKind::Feedback1, fb.kind);

        // add-CID + FEEDBACK-2 NACK with SN 0x123
        let fb = parse_feedback(&[0xe5, 0x41, 0x23], CidType::Small).unwrap();
        assert_eq!(5, fb.cid);
        assert_eq!(
            FeedbackKind::Feedback2 {
                acktype: FeedbackAck::Nack,
                mode: 0,
                sn: 0x123,
            },
            fb.kind
        );
    }

    #[test]
    fn parse_large_cid_feedback() {
        let fb = parse_feedback(&[0x07, 0x00], CidType::Large).unwrap();
        assert_eq!(7, fb.cid);
        assert_eq!(FeedbackKind::Feedback1, fb.kind);
    }

    #[test]
    fn truncated_feedback_is_rejected() {
        assert!(parse_feedback(&[], CidType::Small).is_err());
        assert!(parse_feedback(&[0xe5], CidType::Small).is_err());
    }
}
