//! The RTP profile (0x0001, RFC 3095 §5.7): compresses IP/UDP/RTP
//! against the RTP sequence number, with scaled timestamp encoding.
//!
//! RTP streams are recognized among UDP streams by the configured
//! port list, the user supplied detection callback, or an existing
//! RTP context for the flow.

use super::{
    check_ip_flow, ip_flow_key_parts, profile_index, rfc3095_encode, rfc3095_feedback,
    rfc3095_reinit, EncodedHeader, Profile,
};
use crate::compressor::CompressorCore;
use crate::context::{Context, ContextTable, ProfileData};
use crate::encodings::TsScaled;
use crate::err::Layer;
use crate::feedback::DeliveredFeedback;
use crate::packet::{ParsedPacket, RtpSlice, UdpSlice, IP_NUMBER_UDP};
use crate::rfc3095::{EncodeOutOfSpace, Rfc3095Ctxt, RtpCtxt, TransportCtxt, UdpCtxt};
use crate::{ProfileId, RtpDetectInfo};

pub(crate) struct RtpProfile;

fn rtp_slice<'a>(pkt: &ParsedPacket<'a>) -> Option<RtpSlice<'a>> {
    let transport = pkt.from_transport();
    if transport.len() < UdpSlice::LEN {
        return None;
    }
    let rtp = RtpSlice::from_slice(&transport[UdpSlice::LEN..], Layer::RtpHeader).ok()?;
    // CSRC list compression is not supported, plain RTP only
    if rtp.version() != 2 || rtp.csrc_count() != 0 {
        return None;
    }
    Some(rtp)
}

impl Profile for RtpProfile {
    fn id(&self) -> ProfileId {
        ProfileId::Rtp
    }

    fn matches(
        &self,
        core: &CompressorCore,
        contexts: &ContextTable,
        pkt: &ParsedPacket<'_>,
    ) -> Option<u64> {
        if pkt.transport_protocol() != IP_NUMBER_UDP {
            return None;
        }
        let udp = pkt.udp().ok()?;
        let rtp = rtp_slice(pkt)?;
        let key = ip_flow_key_parts(
            pkt,
            &[
                &udp.source_port().to_be_bytes(),
                &udp.destination_port().to_be_bytes(),
                &rtp.ssrc().to_be_bytes(),
            ],
        );

        if core.rtp_port_hit(udp.destination_port()) {
            return Some(key);
        }
        let payload = &pkt.from_transport()[UdpSlice::LEN..];
        if core.rtp_detect(&RtpDetectInfo {
            source_port: udp.source_port(),
            destination_port: udp.destination_port(),
            payload,
        }) {
            return Some(key);
        }
        // a context already compressing this flow as RTP keeps it RTP
        let rtp_idx = profile_index(ProfileId::Rtp)?;
        let known = contexts
            .slots()
            .iter()
            .flatten()
            .any(|ctx| {
                ctx.profile_idx == rtp_idx && ctx.key == key && self.check_context(ctx, pkt)
            });
        if known {
            Some(key)
        } else {
            None
        }
    }

    fn create(&self, core: &CompressorCore, pkt: &ParsedPacket<'_>) -> ProfileData {
        let (udp_ctxt, ssrc, pt, marker, sn, ts) = match (pkt.udp(), rtp_slice(pkt)) {
            (Ok(udp), Some(rtp)) => (
                UdpCtxt::new(udp.source_port(), udp.destination_port(), udp.checksum()),
                rtp.ssrc(),
                rtp.payload_type(),
                rtp.marker(),
                rtp.sequence_number(),
                rtp.timestamp(),
            ),
            _ => (UdpCtxt::new(0, 0, 0), 0, 0, false, 0, 0),
        };
        ProfileData::Rfc3095(Box::new(Rfc3095Ctxt::new(
            pkt,
            TransportCtxt::Rtp(RtpCtxt {
                udp: udp_ctxt,
                ssrc,
                payload_type: pt,
                payload_type_count: 1,
                marker,
                ts: TsScaled::new(ts, core.wlsb_width, crate::rfc3095::OA_REPETITIONS),
                stride_announced: false,
            }),
            // the master SN of an RTP flow is the RTP SN itself
            sn.wrapping_sub(1),
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
        match (&ctxt.transport, pkt.udp(), rtp_slice(pkt)) {
            (TransportCtxt::Rtp(rtp_ctxt), Ok(udp), Some(rtp)) => {
                rtp_ctxt.udp.source_port == udp.source_port()
                    && rtp_ctxt.udp.destination_port == udp.destination_port()
                    && rtp_ctxt.ssrc == rtp.ssrc()
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
        let rtp = rtp_slice(pkt).ok_or(EncodeOutOfSpace)?;
        let payload_offset = pkt.transport_offset() + UdpSlice::LEN + rtp.header_len();
        if payload_offset > pkt.total_len() {
            return Err(EncodeOutOfSpace);
        }
        rfc3095_encode(core, ctx, pkt, dest, ProfileId::Rtp, payload_offset)
    }

    fn feedback(&self, _core: &CompressorCore, ctx: &mut Context, fb: &DeliveredFeedback) {
        rfc3095_feedback(ctx, fb);
    }

    fn reinit(&self, ctx: &mut Context) {
        rfc3095_reinit(ctx);
    }

    fn uses_udp_port(&self, ctx: &Context, port: u16) -> bool {
        match ctx.data.rfc3095().map(|c| &c.transport) {
            Some(TransportCtxt::Rtp(rtp)) => {
                rtp.udp.source_port == port || rtp.udp.destination_port == port
            }
            _ => false,
        }
    }
}
