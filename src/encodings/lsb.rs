//! Least Significant Bits encoding (RFC 3095, §4.5.1).
//!
//! A value `v` can be transmitted with `k` bits relative to a reference
//! `v_ref` known at the decompressor when `v` lies in the interpretation
//! interval `[v_ref - p, v_ref + 2^k - 1 - p]`. The offset `p` is fixed
//! per field by the RFC.

/// Interpretation interval offset for sequence numbers.
///
/// `p = -1` shifts the interval to `[v_ref + 1, v_ref + 2^k]`: the SN
/// always increases, so no bits are wasted on values behind the
/// reference.
pub(crate) const P_SN: i64 = -1;

/// Interpretation interval offset for IP-ID offsets.
pub(crate) const P_IP_ID: i64 = 0;

/// Interpretation interval offset for the scaled RTP timestamp, which
/// increases with the flow like the SN does.
pub(crate) const P_RTP_TS: i64 = -1;

/// Returns the smallest width `k` that places `value` inside the
/// interpretation interval around `reference`, under wraparound
/// arithmetic of the given field width.
///
/// `field_bits` must be 16 or 32.
pub(crate) fn lsb_k(reference: u32, value: u32, field_bits: u32, p: i64) -> u8 {
    debug_assert!(field_bits == 16 || field_bits == 32);
    let modulus = 1u64 << field_bits;
    // lower bound of the interval, reduced into the field range
    let lower = (i64::from(reference) - p).rem_euclid(modulus as i64) as u64;
    let distance = (u64::from(value) + modulus - lower) % modulus;
    for k in 0..field_bits {
        if distance <= (1u64 << k) - 1 {
            return k as u8;
        }
    }
    field_bits as u8
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sequence_number_steps() {
        // +1 steps fit in 0 bits with p = -1
        assert_eq!(0, lsb_k(10, 11, 16, P_SN));
        // +16 steps need 4 bits
        assert_eq!(4, lsb_k(10, 26, 16, P_SN));
        // wraparound at the top of the field
        assert_eq!(0, lsb_k(0xffff, 0, 16, P_SN));
    }

    #[test]
    fn ip_id_offsets() {
        assert_eq!(0, lsb_k(42, 42, 16, P_IP_ID));
        assert_eq!(1, lsb_k(42, 43, 16, P_IP_ID));
        assert_eq!(16, lsb_k(42, 41, 16, P_IP_ID));
    }

    proptest! {
        /// The decompressor recovers the value: within the interval
        /// implied by (reference, k, p) the value is unique modulo 2^k.
        #[test]
        fn interval_contains_value(
            reference in 0u32..=0xffff,
            value in 0u32..=0xffff,
        ) {
            for &p in &[P_SN, P_IP_ID] {
                let k = lsb_k(reference, value, 16, p);
                let modulus = 1u64 << 16;
                let lower =
                    (i64::from(reference) - p).rem_euclid(modulus as i64) as u64;
                let distance = (u64::from(value) + modulus - lower) % modulus;
                prop_assert!(distance < (1u64 << k));
                // minimality: one bit less no longer covers the value
                if k > 0 {
                    prop_assert!(distance > (1u64 << (k - 1)) - 1);
                }
            }
        }
    }
}
