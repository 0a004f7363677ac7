//! Window based LSB encoding (RFC 3095, §4.5.2).

use super::lsb::lsb_k;
use std::collections::VecDeque;

/// One reference kept in the encoding window: a value that was sent
/// earlier and that the decompressor may still be using as `v_ref`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct WlsbRef {
    /// SN of the packet that carried the value (window purge handle).
    sn: u16,
    /// The transmitted value itself.
    value: u32,
}

/// Sliding window of recently sent values for W-LSB encoding.
///
/// The compressor does not know which of the last transmitted values the
/// decompressor currently uses as its reference, so the width `k` must
/// cover the interpretation interval of every value still inside the
/// window. The window slides by itself once `width` values were recorded
/// and is purged up to an acknowledged SN when feedback arrives
/// (O-mode).
#[derive(Clone, Debug)]
pub(crate) struct WlsbWindow {
    /// Width of the encoded field (16 or 32 bits).
    field_bits: u32,
    /// Interpretation interval offset of the encoded field.
    p: i64,
    /// Maximum number of references kept (a power of two).
    width: usize,
    refs: VecDeque<WlsbRef>,
}

impl WlsbWindow {
    pub(crate) fn new(field_bits: u32, width: usize, p: i64) -> WlsbWindow {
        debug_assert!(width.is_power_of_two());
        WlsbWindow {
            field_bits,
            p,
            width,
            refs: VecDeque::with_capacity(width),
        }
    }

    /// Records a sent value, dropping the oldest reference if the
    /// window is full.
    pub(crate) fn add(&mut self, sn: u16, value: u32) {
        if self.refs.len() == self.width {
            self.refs.pop_front();
        }
        self.refs.push_back(WlsbRef { sn, value });
    }

    /// Smallest width that encodes `value` against every reference
    /// still in the window.
    ///
    /// An empty window offers no reference at all, so the full field
    /// width is reported (the caller then falls back to a packet that
    /// carries the value uncompressed).
    pub(crate) fn k_for(&self, value: u32) -> u8 {
        if self.refs.is_empty() {
            return self.field_bits as u8;
        }
        self.refs
            .iter()
            .map(|r| lsb_k(r.value, value, self.field_bits, self.p))
            .max()
            .unwrap_or(self.field_bits as u8)
    }

    /// Drops every reference sent before the acknowledged SN, keeping
    /// the acknowledged one (the decompressor proved it holds it).
    pub(crate) fn ack_to(&mut self, acked_sn: u16) {
        while let Some(front) = self.refs.front() {
            if front.sn == acked_sn {
                break;
            }
            // distance in packets from the front entry to the acked one;
            // a huge distance means the front is already ahead of the ack
            let behind = acked_sn.wrapping_sub(front.sn);
            if behind == 0 || behind > u16::MAX / 2 {
                break;
            }
            self.refs.pop_front();
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.refs.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encodings::lsb::P_SN;

    #[test]
    fn empty_window_needs_full_width() {
        let w = WlsbWindow::new(16, 4, P_SN);
        assert_eq!(16, w.k_for(1234));
    }

    #[test]
    fn window_covers_every_reference() {
        let mut w = WlsbWindow::new(16, 4, P_SN);
        for sn in 0..4u16 {
            w.add(sn, u32::from(sn));
        }
        // value 4 is +1 after the newest but +4 after the oldest
        // reference, so 2 bits are required
        assert_eq!(2, w.k_for(4));
    }

    #[test]
    fn window_slides_by_itself() {
        let mut w = WlsbWindow::new(16, 4, P_SN);
        for sn in 0..100u16 {
            w.add(sn, u32::from(sn));
        }
        // only SNs 96..=99 remain as references
        assert_eq!(2, w.k_for(100));
    }

    #[test]
    fn ack_purges_older_references() {
        let mut w = WlsbWindow::new(16, 4, P_SN);
        for sn in 0..4u16 {
            w.add(sn, u32::from(sn));
        }
        w.ack_to(3);
        // only the acknowledged reference remains
        assert_eq!(0, w.k_for(4));
    }

    #[test]
    fn ack_for_future_sn_keeps_window() {
        let mut w = WlsbWindow::new(16, 4, P_SN);
        w.add(10, 10);
        w.ack_to(9);
        assert!(!w.is_empty());
    }
}
