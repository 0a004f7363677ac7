/// Pre-computed tables for the CRCs used in ROHC packets (CRC-2, CRC-3,
/// CRC-6, CRC-7 & CRC-8) together with the 32 bit FCS protecting
/// reassembled segments.
///
/// The small CRCs protect compressed headers: CRC-8 covers IR and IR-DYN
/// headers, CRC-7 covers type-2 packets and CRC-3 covers type-0 and
/// type-1 packets. All of them are computed with reflected polynomials
/// via one table lookup per input byte.
///
/// # Example Usage:
///
/// ```
/// use rohc_comp::CrcTables;
///
/// let tables = CrcTables::new();
///
/// // incremental computation matches one-shot computation
/// let msg = [0x45u8, 0x00, 0x00, 0x54];
/// assert_eq!(
///     tables.crc8_update(tables.crc8(&msg[..2]), &msg[2..]),
///     tables.crc8(&msg)
/// );
/// ```
#[derive(Clone)]
pub struct CrcTables {
    crc2: [u8; 256],
    crc3: [u8; 256],
    crc6: [u8; 256],
    crc7: [u8; 256],
    crc8: [u8; 256],
    fcs32: [u32; 256],
}

/// Initial value for CRC-2 computations.
pub const CRC_INIT_2: u8 = 0x3;
/// Initial value for CRC-3 computations.
pub const CRC_INIT_3: u8 = 0x7;
/// Initial value for CRC-6 computations.
pub const CRC_INIT_6: u8 = 0x3f;
/// Initial value for CRC-7 computations.
pub const CRC_INIT_7: u8 = 0x7f;
/// Initial value for CRC-8 computations.
pub const CRC_INIT_8: u8 = 0xff;
/// Initial value for FCS-32 computations.
pub const CRC_INIT_FCS32: u32 = 0xffff_ffff;

/// Byte length of the FCS-32 appended to a reconstructed reception unit.
pub const FCS32_LEN: usize = 4;

// reflected forms of the generator polynomials
const POLY_2: u8 = 0x3; // x^2 + x + 1
const POLY_3: u8 = 0x6; // x^3 + x + 1
const POLY_6: u8 = 0x30; // x^6 + x + 1
const POLY_7: u8 = 0x79; // x^7 + x^4 + x^3 + x^2 + 1
const POLY_8: u8 = 0xe0; // x^8 + x^2 + x + 1
const POLY_FCS32: u32 = 0xedb8_8320; // IEEE 802.3

fn build_table(polynom: u8) -> [u8; 256] {
    let mut table = [0u8; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let mut crc = i as u8;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ polynom;
            } else {
                crc >>= 1;
            }
        }
        *entry = crc;
    }
    table
}

fn build_table32(polynom: u32) -> [u32; 256] {
    let mut table = [0u32; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let mut crc = i as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ polynom;
            } else {
                crc >>= 1;
            }
        }
        *entry = crc;
    }
    table
}

impl CrcTables {
    /// Computes all six lookup tables.
    pub fn new() -> CrcTables {
        CrcTables {
            crc2: build_table(POLY_2),
            crc3: build_table(POLY_3),
            crc6: build_table(POLY_6),
            crc7: build_table(POLY_7),
            crc8: build_table(POLY_8),
            fcs32: build_table32(POLY_FCS32),
        }
    }

    /// Continues a CRC-2 computation over the given bytes.
    #[inline]
    pub fn crc2_update(&self, init: u8, data: &[u8]) -> u8 {
        data.iter().fold(init, |crc, &b| self.crc2[usize::from(b ^ crc)])
    }

    /// CRC-2 over the given bytes, started from [`CRC_INIT_2`].
    #[inline]
    pub fn crc2(&self, data: &[u8]) -> u8 {
        self.crc2_update(CRC_INIT_2, data)
    }

    /// Continues a CRC-3 computation over the given bytes.
    #[inline]
    pub fn crc3_update(&self, init: u8, data: &[u8]) -> u8 {
        data.iter().fold(init, |crc, &b| self.crc3[usize::from(b ^ crc)])
    }

    /// CRC-3 over the given bytes, started from [`CRC_INIT_3`].
    #[inline]
    pub fn crc3(&self, data: &[u8]) -> u8 {
        self.crc3_update(CRC_INIT_3, data)
    }

    /// Continues a CRC-6 computation over the given bytes.
    #[inline]
    pub fn crc6_update(&self, init: u8, data: &[u8]) -> u8 {
        data.iter().fold(init, |crc, &b| self.crc6[usize::from(b ^ crc)])
    }

    /// CRC-6 over the given bytes, started from [`CRC_INIT_6`].
    #[inline]
    pub fn crc6(&self, data: &[u8]) -> u8 {
        self.crc6_update(CRC_INIT_6, data)
    }

    /// Continues a CRC-7 computation over the given bytes.
    #[inline]
    pub fn crc7_update(&self, init: u8, data: &[u8]) -> u8 {
        data.iter().fold(init, |crc, &b| self.crc7[usize::from(b ^ crc)])
    }

    /// CRC-7 over the given bytes, started from [`CRC_INIT_7`].
    #[inline]
    pub fn crc7(&self, data: &[u8]) -> u8 {
        self.crc7_update(CRC_INIT_7, data)
    }

    /// Continues a CRC-8 computation over the given bytes.
    #[inline]
    pub fn crc8_update(&self, init: u8, data: &[u8]) -> u8 {
        data.iter().fold(init, |crc, &b| self.crc8[usize::from(b ^ crc)])
    }

    /// CRC-8 over the given bytes, started from [`CRC_INIT_8`].
    #[inline]
    pub fn crc8(&self, data: &[u8]) -> u8 {
        self.crc8_update(CRC_INIT_8, data)
    }

    /// Continues an FCS-32 computation over the given bytes.
    ///
    /// This is the reflected IEEE 802.3 CRC-32 without the final
    /// inversion. It protects a staged reconstructed reception unit
    /// against reassembly errors and is not used on compressed headers.
    #[inline]
    pub fn fcs32_update(&self, init: u32, data: &[u8]) -> u32 {
        data.iter().fold(init, |crc, &b| {
            (crc >> 8) ^ self.fcs32[usize::from((crc as u8) ^ b)]
        })
    }

    /// FCS-32 over the given bytes, started from [`CRC_INIT_FCS32`].
    #[inline]
    pub fn fcs32(&self, data: &[u8]) -> u32 {
        self.fcs32_update(CRC_INIT_FCS32, data)
    }
}

impl Default for CrcTables {
    fn default() -> CrcTables {
        CrcTables::new()
    }
}

impl core::fmt::Debug for CrcTables {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CrcTables").finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    /// Bit-by-bit computation of a reflected CRC with at most 8 bits.
    fn bitwise_crc(polynom: u8, init: u8, data: &[u8]) -> u8 {
        let mut crc = init;
        for &byte in data {
            crc ^= byte;
            for _ in 0..8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ polynom;
                } else {
                    crc >>= 1;
                }
            }
        }
        crc
    }

    proptest! {
        #[test]
        fn tables_match_bitwise_reference(
            data in proptest::collection::vec(any::<u8>(), 0..64)
        ) {
            let t = CrcTables::new();
            prop_assert_eq!(t.crc2(&data), bitwise_crc(POLY_2, CRC_INIT_2, &data));
            prop_assert_eq!(t.crc3(&data), bitwise_crc(POLY_3, CRC_INIT_3, &data));
            prop_assert_eq!(t.crc6(&data), bitwise_crc(POLY_6, CRC_INIT_6, &data));
            prop_assert_eq!(t.crc7(&data), bitwise_crc(POLY_7, CRC_INIT_7, &data));
            prop_assert_eq!(t.crc8(&data), bitwise_crc(POLY_8, CRC_INIT_8, &data));
        }

        #[test]
        fn incremental_matches_oneshot(
            head in proptest::collection::vec(any::<u8>(), 0..32),
            tail in proptest::collection::vec(any::<u8>(), 0..32)
        ) {
            let t = CrcTables::new();
            let mut all = head.clone();
            all.extend(&tail);
            prop_assert_eq!(t.crc8_update(t.crc8(&head), &tail), t.crc8(&all));
            prop_assert_eq!(t.crc7_update(t.crc7(&head), &tail), t.crc7(&all));
            prop_assert_eq!(t.crc3_update(t.crc3(&head), &tail), t.crc3(&all));
            prop_assert_eq!(
                t.fcs32_update(t.fcs32(&head), &tail),
                t.fcs32(&all)
            );
        }
    }

    #[test]
    fn small_crc_value_ranges() {
        let t = CrcTables::new();
        for i in 0..=255u8 {
            let data = [i];
            assert!(t.crc2(&data) <= 0x3);
            assert!(t.crc3(&data) <= 0x7);
            assert!(t.crc6(&data) <= 0x3f);
            assert!(t.crc7(&data) <= 0x7f);
        }
    }

    #[test]
    fn fcs32_known_vector() {
        // the classic CRC-32 check value for "123456789" is 0xcbf43926
        // after the final inversion that FCS-32 leaves to the check side
        let t = CrcTables::new();
        assert_eq!(!t.fcs32(b"123456789"), 0xcbf4_3926);
    }

    #[test]
    fn empty_input_keeps_init() {
        let t = CrcTables::new();
        assert_eq!(t.crc8(&[]), CRC_INIT_8);
        assert_eq!(t.crc7(&[]), CRC_INIT_7);
        assert_eq!(t.crc3(&[]), CRC_INIT_3);
        assert_eq!(t.fcs32(&[]), CRC_INIT_FCS32);
    }
}
