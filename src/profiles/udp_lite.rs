//! The UDP-Lite profile (0x0008, RFC 4019): like UDP, with the
//! checksum coverage compressed away when it tracks the datagram
//! length.

use super::{
    check_ip_flow, ip_flow_key_parts, rfc3095_encode, rfc3095_feedback, rfc3095_reinit,
    EncodedHeader, Profile,
};
use crate::compressor::CompressorCore;
use crate::context::{Context, ContextTable, ProfileData};
use crate::feedback::DeliveredFeedback;
use crate::packet::{ParsedPacket, UdpSlice, IP_NUMBER_UDPLITE};
use crate::rfc3095::{EncodeOutOfSpace, Rfc3095Ctxt, TransportCtxt, UdpLiteCtxt};
use crate::ProfileId;

pub(crate) struct UdpLiteProfile;

impl Profile for UdpLiteProfile {
    fn id(&self) -> ProfileId {
        ProfileId::UdpLite
    }

    fn matches(
        &self,
        _core: &CompressorCore,
        _contexts: &ContextTable,
        pkt: &ParsedPacket<'_>,
    ) -> Option<u64> {
        if pkt.transport_protocol() != IP_NUMBER_UDPLITE {
            return None;
        }
        let udp = pkt.udp().ok()?;
        Some(ip_flow_key_parts(
            pkt,
            &[
                &udp.source_port().to_be_bytes(),
                &udp.destination_port().to_be_bytes(),
            ],
        ))
    }

    fn create(&self, core: &CompressorCore, pkt: &ParsedPacket<'_>) -> ProfileData {
        let (source_port, destination_port, coverage) = match pkt.udp() {
            Ok(udp) => (
                udp.source_port(),
                udp.destination_port(),
                udp.checksum_coverage(),
            ),
            Err(_) => (0, 0, 0),
        };
        let datagram_len = pkt.total_len() - pkt.transport_offset();
        let initial_sn = core.random_u16();
        ProfileData::Rfc3095(Box::new(Rfc3095Ctxt::new(
            pkt,
            TransportCtxt::UdpLite(UdpLiteCtxt {
                source_port,
                destination_port,
                coverage_inferred: usize::from(coverage) == datagram_len,
                coverage_count: 1,
            }),
            initial_sn,
            core.wlsb_width,
        )))
    }

    fn check_context(&self, ctx: &Context, pkt: &ParsedPacket<'_>) -> bool {
        let ctxt = match ctx.data.rfc3095() {
            Some(ctxt) => ctxt,
            None => return false,
        };
        if !check_ip_flow(ctxt, pkt) {
            return false;
        }
        match (&ctxt.transport, pkt.udp()) {
            (TransportCtxt::UdpLite(lite), Ok(slice)) => {
                lite.source_port == slice.source_port()
                    && lite.destination_port == slice.destination_port()
            }
            _ => false,
        }
    }

    fn encode(
        &self,
        core: &CompressorCore,
        ctx: &mut Context,
        pkt: &ParsedPacket<'_>,
        dest: &mut [u8],
    ) -> Result<EncodedHeader, EncodeOutOfSpace> {
        let payload_offset = pkt.transport_offset() + UdpSlice::LEN;
        if payload_offset > pkt.total_len() {
            return Err(EncodeOutOfSpace);
        }
        rfc3095_encode(core, ctx, pkt, dest, ProfileId::UdpLite, payload_offset)
    }

    fn feedback(&self, _core: &CompressorCore, ctx: &mut Context, fb: &DeliveredFeedback) {
        rfc3095_feedback(ctx, fb);
    }

    fn reinit(&self, ctx: &mut Context) {
        rfc3095_reinit(ctx);
    }

    fn uses_udp_port(&self, ctx: &Context, port: u16) -> bool {
        match ctx.data.rfc3095().map(|c| &c.transport) {
            Some(TransportCtxt::UdpLite(lite)) => {
                lite.source_port == port || lite.destination_port == port
            }
            _ => false,
        }
    }
}
