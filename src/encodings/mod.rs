//! Encoding primitives shared by the compression profiles (RFC 3095,
//! §4.5): plain LSB, window based LSB, self-describing variable length
//! values, offset IP-ID and the scaled RTP timestamp.

mod ip_id;
mod lsb;
mod sdvl;
mod ts_sc;
mod wlsb;

pub(crate) use ip_id::*;
pub(crate) use lsb::*;
pub use sdvl::{sdvl_decode, sdvl_encode, sdvl_encoded_len, SDVL_MAX_VALUE};
pub(crate) use ts_sc::*;
pub(crate) use wlsb::*;
