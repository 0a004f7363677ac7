//! The Uncompressed profile (0x0000, RFC 3095 §5.10): packets pass
//! through unchanged after a short IR phase established the context.

use super::{EncodedHeader, Profile};
use crate::compressor::CompressorCore;
use crate::context::{Context, ContextTable, ProfileData, UncompressedCtxt};
use crate::feedback::{DeliveredFeedback, FeedbackAck, FeedbackKind};
use crate::packet::ParsedPacket;
use crate::rfc3095::{EncodeOutOfSpace, PacketWriter, OA_REPETITIONS};
use crate::{CidType, ContextState, OperatingMode, ProfileId, RohcPacketType};

pub(crate) struct UncompressedProfile;

impl Profile for UncompressedProfile {
    fn id(&self) -> ProfileId {
        ProfileId::Uncompressed
    }

    fn matches(
        &self,
        _core: &CompressorCore,
        _contexts: &ContextTable,
        _pkt: &ParsedPacket<'_>,
    ) -> Option<u64> {
        // accepts anything, which is why it is evaluated last
        Some(0)
    }

    fn create(&self, _core: &CompressorCore, _pkt: &ParsedPacket<'_>) -> ProfileData {
        ProfileData::Uncompressed(UncompressedCtxt::default())
    }

    fn check_context(&self, _ctx: &Context, _pkt: &ParsedPacket<'_>) -> bool {
        true
    }

    fn encode(
        &self,
        core: &CompressorCore,
        ctx: &mut Context,
        pkt: &ParsedPacket<'_>,
        dest: &mut [u8],
    ) -> Result<EncodedHeader, EncodeOutOfSpace> {
        let cid = ctx.cid;
        let cid_type = core.cid_type;
        let ir_timeout = core.ir_timeout;
        let uctxt = ctx.data.uncompressed_mut().ok_or(EncodeOutOfSpace)?;

        let mut state = ctx.state;
        if uctxt.refresh_ir_count >= ir_timeout {
            uctxt.refresh_ir_count = 0;
            state = ContextState::Ir;
        }
        uctxt.refresh_ir_count += 1;

        let mut w = PacketWriter::new(dest);
        let encoded = if state == ContextState::Ir {
            // IR without a dynamic chain, the packet itself is payload
            push_add_cid(&mut w, cid_type, cid)?;
            w.push(0xfc)?;
            if cid_type == CidType::Large {
                w.push_sdvl(u32::from(cid))?;
            }
            w.push(ProfileId::Uncompressed.wire_octet())?;
            let crc_idx = w.len();
            w.push(0)?;
            let crc = core.crc.crc8(w.written());
            w.patch(crc_idx, crc);

            uctxt.ir_count += 1;
            ctx.state = if uctxt.ir_count >= u32::from(OA_REPETITIONS) {
                ContextState::So
            } else {
                ContextState::Ir
            };
            EncodedHeader {
                header_len: w.len(),
                packet_type: RohcPacketType::Ir,
                payload_offset: 0,
            }
        } else {
            // Normal packet: the first octet moves behind the CID
            // information, the rest of the packet is payload
            push_add_cid(&mut w, cid_type, cid)?;
            w.push(pkt.data()[0])?;
            if cid_type == CidType::Large {
                w.push_sdvl(u32::from(cid))?;
            }
            ctx.state = ContextState::So;
            EncodedHeader {
                header_len: w.len(),
                packet_type: RohcPacketType::Normal,
                payload_offset: 1,
            }
        };
        Ok(encoded)
    }

    fn feedback(&self, _core: &CompressorCore, ctx: &mut Context, fb: &DeliveredFeedback) {
        let acktype = match fb.kind {
            FeedbackKind::Feedback1 => FeedbackAck::Ack,
            FeedbackKind::Feedback2 { acktype, .. } => acktype,
        };
        match acktype {
            FeedbackAck::Ack => {
                if ctx.mode == OperatingMode::Unidirectional {
                    ctx.mode = OperatingMode::Optimistic;
                }
            }
            FeedbackAck::Nack | FeedbackAck::StaticNack => {
                self.reinit(ctx);
            }
            FeedbackAck::Reserved => {}
        }
    }

    fn reinit(&self, ctx: &mut Context) {
        ctx.state = ContextState::Ir;
        if let Some(uctxt) = ctx.data.uncompressed_mut() {
            uctxt.ir_count = 0;
            uctxt.refresh_ir_count = 0;
        }
    }
}

fn push_add_cid(
    w: &mut PacketWriter<'_>,
    cid_type: CidType,
    cid: u16,
) -> Result<(), EncodeOutOfSpace> {
    if cid_type == CidType::Small && cid != 0 {
        w.push(0xe0 | (cid as u8 & 0x0f))?;
    }
    Ok(())
}
