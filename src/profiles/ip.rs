//! The IP-only profile (0x0004, RFC 3843): compresses one or two
//! IP headers against an internal 16 bit sequence number.

use super::{
    check_ip_flow, ip_flow_key_parts, rfc3095_encode, rfc3095_feedback, rfc3095_reinit,
    EncodedHeader, Profile,
};
use crate::compressor::CompressorCore;
use crate::context::{Context, ContextTable, ProfileData};
use crate::feedback::DeliveredFeedback;
use crate::packet::ParsedPacket;
use crate::rfc3095::{EncodeOutOfSpace, Rfc3095Ctxt, TransportCtxt};
use crate::ProfileId;

pub(crate) struct IpProfile;

impl Profile for IpProfile {
    fn id(&self) -> ProfileId {
        ProfileId::Ip
    }

    fn matches(
        &self,
        _core: &CompressorCore,
        _contexts: &ContextTable,
        pkt: &ParsedPacket<'_>,
    ) -> Option<u64> {
        // anything the parser accepted is at least an IP flow
        Some(ip_flow_key_parts(pkt, &[]))
    }

    fn create(&self, core: &CompressorCore, pkt: &ParsedPacket<'_>) -> ProfileData {
        // the SN starts at a random value (RFC 3095, §5.11.1)
        let initial_sn = core.random_u16();
        ProfileData::Rfc3095(Box::new(Rfc3095Ctxt::new(
            pkt,
            TransportCtxt::Ip,
            initial_sn,
            core.wlsb_width,
        )))
    }

    fn check_context(&self, ctx: &Context, pkt: &ParsedPacket<'_>) -> bool {
        ctx.data
            .rfc3095()
            .map(|ctxt| check_ip_flow(ctxt, pkt))
            .unwrap_or(false)
    }

    fn encode(
        &self,
        core: &CompressorCore,
        ctx: &mut Context,
        pkt: &ParsedPacket<'_>,
        dest: &mut [u8],
    ) -> Result<EncodedHeader, EncodeOutOfSpace> {
        // everything after the IP headers is payload
        let payload_offset = pkt.transport_offset();
        rfc3095_encode(core, ctx, pkt, dest, ProfileId::Ip, payload_offset)
    }

    fn feedback(&self, _core: &CompressorCore, ctx: &mut Context, fb: &DeliveredFeedback) {
        rfc3095_feedback(ctx, fb);
    }

    fn reinit(&self, ctx: &mut Context) {
        rfc3095_reinit(ctx);
    }
}
