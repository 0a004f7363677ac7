//! The generic compression engine shared by the IP-only, UDP, UDP-Lite
//! and RTP profiles: per-field change tracking, the IR/FO/SO state
//! machine, packet type selection and the packet builders.

mod build;
mod context;
mod decide;

pub(crate) use build::*;
pub(crate) use context::*;
pub(crate) use decide::*;
