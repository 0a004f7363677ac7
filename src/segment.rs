//! Segmentation of compressed packets that exceed the link MTU
//! (RFC 3095, §5.2.5).

use crate::crc::{CrcTables, FCS32_LEN};

/// The staging area for at most one pending reconstructed reception
/// unit: the compressed header and payload followed by their FCS-32.
#[derive(Debug, Default)]
pub(crate) struct SegmentStage {
    rru: Vec<u8>,
    off: usize,
}

impl SegmentStage {
    /// True while staged bytes wait to be retrieved as segments.
    pub(crate) fn pending(&self) -> bool {
        self.off < self.rru.len()
    }

    /// Stages header and payload and appends the protecting FCS-32.
    /// Any previously staged unit is discarded.
    pub(crate) fn stage(&mut self, header: &[u8], payload: &[u8], crc: &CrcTables) {
        self.rru.clear();
        self.off = 0;
        self.rru.extend_from_slice(header);
        self.rru.extend_from_slice(payload);
        let fcs = crc.fcs32(&self.rru);
        self.rru.extend_from_slice(&fcs.to_be_bytes());
    }

    /// Length of the staged unit (FCS included).
    pub(crate) fn len(&self) -> usize {
        self.rru.len()
    }

    /// Writes the next `1111111F`-framed segment into `dest` and
    /// returns its length together with the final-segment flag.
    ///
    /// `dest` must hold at least the type octet plus one payload byte.
    pub(crate) fn emit(&mut self, dest: &mut [u8]) -> (usize, bool) {
        let remaining = self.rru.len() - self.off;
        let chunk = remaining.min(dest.len() - 1);
        let is_final = chunk == remaining;
        dest[0] = 0xfe | u8::from(is_final);
        dest[1..1 + chunk].copy_from_slice(&self.rru[self.off..self.off + chunk]);
        self.off += chunk;
        if is_final {
            self.rru.clear();
            self.off = 0;
        }
        (1 + chunk, is_final)
    }
}

/// Byte length of the FCS protecting a staged unit.
pub(crate) const SEGMENT_PROTECTION_LEN: usize = FCS32_LEN;
