//! Offset IP-ID encoding support (RFC 3095, §4.5.5).
//!
//! The IPv4 identification field of most stacks increases by a small
//! step per packet, so the offset `IP-ID - SN` stays almost constant
//! and compresses well with W-LSB. Stacks that store the field in
//! little endian order or randomize it are detected here so the
//! encoding is only applied where it is valid.

/// Largest increment between two consecutive IP-IDs that still counts
/// as sequential behaviour.
const MAX_SEQUENTIAL_DELTA: u16 = 20;

/// Behaviour of the IPv4 identification field observed between two
/// consecutive packets of a flow.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct IpIdBehaviour {
    /// The field is transmitted in network byte order.
    pub nbo: bool,
    /// The field jumps randomly, offset encoding is unusable.
    pub rnd: bool,
    /// The field is static (both packets carried the same value).
    pub sid: bool,
}

/// Classifies the step from `old_id` to `new_id`.
pub(crate) fn detect_ip_id_behaviour(old_id: u16, new_id: u16) -> IpIdBehaviour {
    if new_id == old_id {
        return IpIdBehaviour {
            nbo: true,
            rnd: false,
            sid: true,
        };
    }
    let delta = new_id.wrapping_sub(old_id);
    if delta > 0 && delta <= MAX_SEQUENTIAL_DELTA {
        return IpIdBehaviour {
            nbo: true,
            rnd: false,
            sid: false,
        };
    }
    let swapped_delta = new_id.swap_bytes().wrapping_sub(old_id.swap_bytes());
    if swapped_delta > 0 && swapped_delta <= MAX_SEQUENTIAL_DELTA {
        return IpIdBehaviour {
            nbo: false,
            rnd: false,
            sid: false,
        };
    }
    IpIdBehaviour {
        nbo: true,
        rnd: true,
        sid: false,
    }
}

/// The offset that is actually W-LSB encoded: the (byte order
/// corrected) IP-ID minus the sequence number.
#[inline]
pub(crate) fn ip_id_offset(ip_id: u16, nbo: bool, sn: u16) -> u16 {
    let corrected = if nbo { ip_id } else { ip_id.swap_bytes() };
    corrected.wrapping_sub(sn)
}
