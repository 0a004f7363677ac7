//! Scaled RTP timestamp encoding (RFC 3095, §4.5.3).
//!
//! RTP timestamps usually increase by a fixed stride per packet
//! (samples per frame). Once the stride is established the compressor
//! transmits `TS_SCALED = (TS - TS_OFFSET) / ts_stride` instead of the
//! timestamp itself, which compresses like a sequence number.

use super::lsb::P_RTP_TS;
use super::wlsb::WlsbWindow;

/// Learning state of the scaled encoding.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TsScState {
    /// No delta observed yet (first packet of the flow).
    InitTs,
    /// A stride candidate is being confirmed.
    InitStride,
    /// Stride established, scaled values are transmitted.
    SendScaled,
}

/// Scaled timestamp tracker of one RTP flow.
#[derive(Clone, Debug)]
pub(crate) struct TsScaled {
    state: TsScState,
    /// Current stride candidate (0 while unknown).
    stride: u32,
    /// `TS_OFFSET`: residue of the timestamp modulo the stride.
    offset: u32,
    /// Scaled value of the most recent packet.
    scaled: u32,
    /// Timestamp of the most recent packet.
    last_ts: u32,
    /// Consecutive packets that confirmed the stride candidate.
    stride_count: u8,
    /// Confirmations needed before the stride is trusted.
    oa_repetitions: u8,
    /// W-LSB window over transmitted scaled values.
    window: WlsbWindow,
}

impl TsScaled {
    pub(crate) fn new(first_ts: u32, window_width: usize, oa_repetitions: u8) -> TsScaled {
        TsScaled {
            state: TsScState::InitTs,
            stride: 0,
            offset: 0,
            scaled: 0,
            last_ts: first_ts,
            stride_count: 0,
            oa_repetitions,
            window: WlsbWindow::new(32, window_width, P_RTP_TS),
        }
    }

    /// Feeds the timestamp of the packet being compressed and updates
    /// the stride learning state.
    pub(crate) fn observe(&mut self, ts: u32) {
        let delta = ts.wrapping_sub(self.last_ts);
        self.last_ts = ts;
        if delta == 0 {
            // unchanged timestamp confirms whatever state we are in
            return;
        }
        match self.state {
            TsScState::InitTs => {
                self.stride = delta;
                self.stride_count = 1;
                self.state = TsScState::InitStride;
            }
            TsScState::InitStride => {
                if delta == self.stride {
                    self.stride_count = self.stride_count.saturating_add(1);
                    if self.stride_count >= self.oa_repetitions {
                        self.offset = ts % self.stride;
                        self.scaled = (ts.wrapping_sub(self.offset)) / self.stride;
                        self.window.clear();
                        self.state = TsScState::SendScaled;
                    }
                } else {
                    self.stride = delta;
                    self.stride_count = 1;
                }
            }
            TsScState::SendScaled => {
                if ts % self.stride == self.offset {
                    self.scaled = (ts.wrapping_sub(self.offset)) / self.stride;
                } else {
                    // stride broke, start learning the new one
                    self.stride = delta;
                    self.stride_count = 1;
                    self.window.clear();
                    self.state = TsScState::InitStride;
                }
            }
        }
    }

    /// True once scaled values can be transmitted.
    pub(crate) fn is_scaled(&self) -> bool {
        self.state == TsScState::SendScaled
    }

    /// Bits needed to transmit the current scaled value, or the full 32
    /// bits while the stride is not established.
    pub(crate) fn scaled_bits(&self) -> u8 {
        if self.is_scaled() {
            self.window.k_for(self.scaled)
        } else {
            32
        }
    }

    pub(crate) fn scaled(&self) -> u32 {
        self.scaled
    }

    pub(crate) fn stride(&self) -> u32 {
        self.stride
    }

    pub(crate) fn last_ts(&self) -> u32 {
        self.last_ts
    }

    /// Records the scaled value as sent under the given SN.
    pub(crate) fn commit(&mut self, sn: u16) {
        if self.is_scaled() {
            self.window.add(sn, self.scaled);
        }
    }

    /// Slides the window forward on an acknowledgment.
    pub(crate) fn ack_to(&mut self, sn: u16) {
        self.window.ack_to(sn);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stride_is_learned_then_scaled() {
        let mut ts = TsScaled::new(1000, 4, 3);
        assert!(!ts.is_scaled());
        ts.observe(1160);
        ts.observe(1320);
        assert!(!ts.is_scaled());
        ts.observe(1480);
        assert!(ts.is_scaled());
        assert_eq!(160, ts.stride());
        // 1480 = 9 * 160 + 40 -> offset 40, scaled 9
        assert_eq!(9, ts.scaled());
    }

    #[test]
    fn scaled_bits_shrink_after_commits() {
        let mut ts = TsScaled::new(0, 4, 3);
        for step in 1..=3u32 {
            ts.observe(step * 160);
        }
        assert!(ts.is_scaled());
        assert_eq!(32, ts.scaled_bits());
        ts.commit(3);
        ts.observe(4 * 160);
        // scaled advanced by one step over the committed reference
        assert_eq!(0, ts.scaled_bits());
    }

    #[test]
    fn changed_stride_restarts_learning() {
        let mut ts = TsScaled::new(0, 4, 3);
        for step in 1..=3u32 {
            ts.observe(step * 160);
        }
        assert!(ts.is_scaled());
        ts.observe(3 * 160 + 7);
        assert!(!ts.is_scaled());
    }
}
