//! The compressor handle: configuration, flow demultiplexing and the
//! per-packet compression pipeline.

use core::cell::Cell;
use core::time::Duration;

use arrayvec::ArrayVec;

use crate::context::{Context, ContextTable};
use crate::crc::CrcTables;
use crate::err::{CompressError, ConfigError, FeedbackError, SegmentError};
use crate::feedback::{parse_feedback, FeedbackRing};
use crate::packet::ParsedPacket;
use crate::profiles::{profile_index, EncodedHeader, PROFILES, PROFILE_COUNT};
use crate::rfc3095::MAX_HEADER_LEN;
use crate::segment::{SegmentStage, SEGMENT_PROTECTION_LEN};
use crate::{
    CidType, ContextState, OperatingMode, ProfileId, RandomCallback, RohcPacketType,
    RtpDetectCallback, RtpDetectInfo, TraceCallback, TraceLevel,
};

/// Packets to compress before a context is forced back to IR state
/// (periodic refresh default).
pub const DEFAULT_IR_TIMEOUT: u32 = 1700;
/// Packets to compress before a context is forced back to FO state
/// (periodic refresh default).
pub const DEFAULT_FO_TIMEOUT: u32 = 700;
/// Default width of the W-LSB encoding windows.
pub const DEFAULT_WLSB_WINDOW_WIDTH: usize = 4;
/// Default byte budget for feedback piggybacked on one packet.
pub const DEFAULT_PIGGYBACK_BUDGET: usize = 500;

/// Configuration, CRC tables and injected callbacks shared with the
/// profiles during compression.
pub(crate) struct CompressorCore {
    pub cid_type: CidType,
    pub max_cid: u16,
    pub mrru: usize,
    pub wlsb_width: usize,
    pub ir_timeout: u32,
    pub fo_timeout: u32,
    pub piggyback_budget: usize,
    pub crc: CrcTables,
    rtp_ports: ArrayVec<u16, { Compressor::MAX_RTP_PORTS }>,
    trace_cb: Option<TraceCallback>,
    random_cb: Option<RandomCallback>,
    rtp_detect_cb: Option<RtpDetectCallback>,
    warned_missing_random: Cell<bool>,
}

impl CompressorCore {
    /// Hands a lazily formatted message to the trace callback.
    pub(crate) fn trace(&self, level: TraceLevel, message: impl FnOnce() -> String) {
        if let Some(cb) = &self.trace_cb {
            cb(level, &message());
        }
    }

    /// A random number from the injected callback; without one the
    /// value is 0 and a warning is traced once.
    pub(crate) fn random_u16(&self) -> u16 {
        match &self.random_cb {
            Some(cb) => cb() as u16,
            None => {
                if !self.warned_missing_random.replace(true) {
                    self.trace(TraceLevel::Warning, || {
                        "no random callback installed, initial SNs start at 0".to_string()
                    });
                }
                0
            }
        }
    }

    /// True when the destination port is in the RTP port list.
    pub(crate) fn rtp_port_hit(&self, port: u16) -> bool {
        self.rtp_ports.binary_search(&port).is_ok()
    }

    /// Asks the injected RTP detection callback, if any.
    pub(crate) fn rtp_detect(&self, info: &RtpDetectInfo<'_>) -> bool {
        match &self.rtp_detect_cb {
            Some(cb) => cb(info),
            None => false,
        }
    }
}

/// Result of a successful [`Compressor::compress`] call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompressResult {
    /// A complete ROHC packet of the given length was written.
    Packet { len: usize },
    /// The packet was staged for segmentation, retrieve it with
    /// [`Compressor::get_segment`].
    Segment,
}

/// Result of a successful [`Compressor::get_segment`] call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SegmentResult {
    /// A segment was written and more are available.
    More { len: usize },
    /// The final segment was written.
    Last { len: usize },
}

/// Information about the most recently compressed packet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LastPacketInfo {
    pub cid: u16,
    pub profile_id: ProfileId,
    pub mode: OperatingMode,
    pub state: ContextState,
    pub packet_type: RohcPacketType,
    /// The packet created its context.
    pub is_context_init: bool,
    pub total_uncompressed_size: usize,
    pub header_uncompressed_size: usize,
    pub total_compressed_size: usize,
    pub header_compressed_size: usize,
}

/// Aggregate information about a compressor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneralInfo {
    pub contexts_used: usize,
    pub packets_compressed: u64,
    pub uncompressed_bytes: u64,
    pub compressed_bytes: u64,
}

/// Statistics of one live context.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContextInfo {
    pub cid: u16,
    pub profile_id: ProfileId,
    pub state: ContextState,
    pub mode: OperatingMode,
    /// Arrival second of the packet that created the context.
    pub active_since_secs: u64,
    pub packets_sent: u64,
    pub ir_sent: u64,
    pub ir_dyn_sent: u64,
    pub feedbacks_received: u64,
    pub total_uncompressed_bytes: u64,
    pub total_compressed_bytes: u64,
    pub total_uncompressed_header_bytes: u64,
    pub total_compressed_header_bytes: u64,
    /// Mean compressed packet size over the last 16 packets.
    pub mean_packet_size_last_16: u32,
    /// Mean compressed header size over the last 16 packets.
    pub mean_header_size_last_16: u32,
    /// Uncompressed and compressed byte totals over the last 16
    /// packets (for a recent compression ratio).
    pub uncompressed_bytes_last_16: u64,
    pub compressed_bytes_last_16: u64,
}

/// A ROHC compressor: owns the per-flow contexts, the feedback ring
/// and the segmentation stage of one channel.
///
/// All profiles start disabled; enable at least one (usually including
/// [`ProfileId::Uncompressed`] as the fallback) before compressing.
///
/// # Example Usage:
///
/// ```
/// use rohc_comp::{CidType, Compressor, CompressResult, ProfileId};
/// use core::time::Duration;
///
/// let mut comp = Compressor::new(CidType::Small, 15).unwrap();
/// comp.enable_profile(ProfileId::Ip).unwrap();
/// comp.enable_profile(ProfileId::Uncompressed).unwrap();
///
/// // a minimal IPv4 packet with 4 payload bytes
/// let packet = [
///     0x45u8, 0x00, 0x00, 0x18, 0x00, 0x01, 0x40, 0x00,
///     0x40, 59, 0x00, 0x00, 10, 0, 0, 1, 10, 0, 0, 2,
///     0xde, 0xad, 0xbe, 0xef,
/// ];
/// let mut rohc = [0u8; 128];
/// let result = comp
///     .compress(Duration::from_secs(0), &packet, &mut rohc)
///     .unwrap();
/// // the first packet of a flow is a full IR packet
/// assert!(matches!(result, CompressResult::Packet { .. }));
/// ```
pub struct Compressor {
    core: CompressorCore,
    contexts: ContextTable,
    feedback: FeedbackRing,
    segments: SegmentStage,
    enabled_profiles: [bool; PROFILE_COUNT],
    packets_compressed: u64,
    total_uncompressed: u64,
    total_compressed: u64,
    last_cid: Option<u16>,
}

impl Compressor {
    /// Maximum number of UDP ports in the RTP detection list.
    pub const MAX_RTP_PORTS: usize = 15;

    /// Largest supported MRRU in bytes (the protecting FCS-32
    /// included).
    pub const MAX_MRRU: usize = 65535;

    /// Creates a compressor for the given CID flavour.
    ///
    /// `max_cid` bounds the context space: the compressor keeps
    /// `max_cid + 1` contexts and must not exceed the flavour maximum
    /// (15 for small CIDs, 65535 for large ones).
    pub fn new(cid_type: CidType, max_cid: u16) -> Result<Compressor, ConfigError> {
        if max_cid > cid_type.max_cid() {
            return Err(ConfigError::MaxCidTooLarge {
                max_cid,
                limit: cid_type.max_cid(),
            });
        }
        Ok(Compressor {
            core: CompressorCore {
                cid_type,
                max_cid,
                mrru: 0,
                wlsb_width: DEFAULT_WLSB_WINDOW_WIDTH,
                ir_timeout: DEFAULT_IR_TIMEOUT,
                fo_timeout: DEFAULT_FO_TIMEOUT,
                piggyback_budget: DEFAULT_PIGGYBACK_BUDGET,
                crc: CrcTables::new(),
                rtp_ports: ArrayVec::new(),
                trace_cb: None,
                random_cb: None,
                rtp_detect_cb: None,
                warned_missing_random: Cell::new(false),
            },
            contexts: ContextTable::new(usize::from(max_cid) + 1),
            feedback: FeedbackRing::new(),
            segments: SegmentStage::default(),
            enabled_profiles: [false; PROFILE_COUNT],
            packets_compressed: 0,
            total_uncompressed: 0,
            total_compressed: 0,
            last_cid: None,
        })
    }

    /// The CID flavour of the channel.
    pub fn cid_type(&self) -> CidType {
        self.core.cid_type
    }

    /// The largest CID the compressor allocates.
    pub fn max_cid(&self) -> u16 {
        self.core.max_cid
    }

    /// The configured MRRU (0 disables segmentation).
    pub fn mrru(&self) -> usize {
        self.core.mrru
    }

    /// Enables a compression profile.
    pub fn enable_profile(&mut self, id: ProfileId) -> Result<(), ConfigError> {
        let idx = profile_index(id).ok_or(ConfigError::UnsupportedProfile {
            profile_id: id.number(),
        })?;
        self.enabled_profiles[idx] = true;
        self.core
            .trace(TraceLevel::Info, || format!("profile {} enabled", id));
        Ok(())
    }

    /// Disables a compression profile. Contexts already bound to it
    /// keep using it.
    pub fn disable_profile(&mut self, id: ProfileId) -> Result<(), ConfigError> {
        let idx = profile_index(id).ok_or(ConfigError::UnsupportedProfile {
            profile_id: id.number(),
        })?;
        self.enabled_profiles[idx] = false;
        self.core
            .trace(TraceLevel::Info, || format!("profile {} disabled", id));
        Ok(())
    }

    /// Installs the trace callback. Only possible before the first
    /// packet was compressed.
    pub fn set_trace_callback(&mut self, callback: TraceCallback) -> Result<(), ConfigError> {
        if self.packets_compressed > 0 {
            return Err(ConfigError::AlreadyInitialized);
        }
        self.core.trace_cb = Some(callback);
        Ok(())
    }

    /// Installs the random number callback used for initial SNs.
    pub fn set_random_callback(&mut self, callback: RandomCallback) {
        self.core.random_cb = Some(callback);
    }

    /// Installs (or removes, with `None`) the RTP detection callback.
    pub fn set_rtp_detection_callback(&mut self, callback: Option<RtpDetectCallback>) {
        self.core.rtp_detect_cb = callback;
    }

    /// Adds a UDP port to the RTP detection list (kept sorted, at most
    /// [`Compressor::MAX_RTP_PORTS`] entries).
    pub fn add_rtp_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::RtpPortZero);
        }
        match self.core.rtp_ports.binary_search(&port) {
            Ok(_) => Err(ConfigError::RtpPortAlreadyInList { port }),
            Err(pos) => {
                if self.core.rtp_ports.is_full() {
                    return Err(ConfigError::RtpPortListFull { port });
                }
                self.core.rtp_ports.insert(pos, port);
                Ok(())
            }
        }
    }

    /// Removes a UDP port from the RTP detection list and destroys
    /// the contexts bound to it.
    pub fn remove_rtp_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::RtpPortZero);
        }
        match self.core.rtp_ports.binary_search(&port) {
            Err(_) => Err(ConfigError::RtpPortNotInList { port }),
            Ok(pos) => {
                self.core.rtp_ports.remove(pos);
                let doomed: Vec<u16> = self
                    .contexts
                    .slots()
                    .iter()
                    .flatten()
                    .filter(|ctx| PROFILES[ctx.profile_idx].uses_udp_port(ctx, port))
                    .map(|ctx| ctx.cid)
                    .collect();
                for cid in doomed {
                    self.core.trace(TraceLevel::Debug, || {
                        format!("destroy context CID {} bound to removed RTP port {}", cid, port)
                    });
                    self.contexts.remove(cid);
                }
                Ok(())
            }
        }
    }

    /// Empties the RTP detection port list.
    pub fn reset_rtp_ports(&mut self) {
        self.core.rtp_ports.clear();
    }

    /// Sets the W-LSB window width (a power of two). Only possible
    /// before the first packet was compressed.
    pub fn set_wlsb_window_width(&mut self, width: usize) -> Result<(), ConfigError> {
        if width == 0 || !width.is_power_of_two() {
            return Err(ConfigError::InvalidWindowWidth { width });
        }
        if self.packets_compressed > 0 {
            return Err(ConfigError::AlreadyInitialized);
        }
        self.core.wlsb_width = width;
        Ok(())
    }

    /// Sets the periodic refresh timeouts in packets (`ir > fo > 0`).
    /// Only possible before the first packet was compressed.
    pub fn set_periodic_refreshes(
        &mut self,
        ir_timeout: u32,
        fo_timeout: u32,
    ) -> Result<(), ConfigError> {
        if fo_timeout == 0 || ir_timeout <= fo_timeout {
            return Err(ConfigError::InvalidRefreshTimeouts {
                ir_timeout,
                fo_timeout,
            });
        }
        if self.packets_compressed > 0 {
            return Err(ConfigError::AlreadyInitialized);
        }
        self.core.ir_timeout = ir_timeout;
        self.core.fo_timeout = fo_timeout;
        Ok(())
    }

    /// Sets the MRRU (0 disables segmentation, the FCS-32 counts
    /// towards it).
    pub fn set_mrru(&mut self, mrru: usize) -> Result<(), ConfigError> {
        if mrru > Compressor::MAX_MRRU {
            return Err(ConfigError::MrruTooLarge {
                mrru,
                limit: Compressor::MAX_MRRU,
            });
        }
        self.core.mrru = mrru;
        Ok(())
    }

    /// Sets the byte budget for feedback piggybacked on one packet.
    pub fn set_piggyback_budget(&mut self, budget: usize) {
        self.core.piggyback_budget = budget;
    }

    /// Compresses one IP packet into `rohc`.
    ///
    /// `arrival_time` orders contexts for LRU recycling; pass a zero
    /// duration when unknown. On [`CompressResult::Segment`] no bytes
    /// were written and the packet waits in the segmentation stage.
    pub fn compress(
        &mut self,
        arrival_time: Duration,
        uncomp: &[u8],
        rohc: &mut [u8],
    ) -> Result<CompressResult, CompressError> {
        if rohc.is_empty() {
            return Err(CompressError::OutputTooSmall {
                required_len: 1,
                len: 0,
                mrru: self.core.mrru,
            });
        }
        let pkt = ParsedPacket::from_slice(uncomp)?;
        let arrival_secs = arrival_time.as_secs();

        let (profile_idx, key) = self
            .select_profile(&pkt)
            .ok_or(CompressError::NoMatchingProfile)?;
        let (mut cid, mut created) = self.find_or_create(profile_idx, key, &pkt, arrival_secs);

        // 1. piggybacked feedback rides in front of the header
        let budget = self.core.piggyback_budget.min(rohc.len());
        let mut feedback_len = 0;
        while let Some(written) = self.feedback.drain_one(&mut rohc[feedback_len..budget]) {
            feedback_len += written;
        }

        // 2. the profile writes the compressed header into scratch
        let mut scratch = [0u8; MAX_HEADER_LEN];
        let encoded = {
            let encoded = self.encode_with(profile_idx, cid, &pkt, &mut scratch);
            match encoded {
                Ok(encoded) => encoded,
                Err(_) => {
                    // profile failure falls back to Uncompressed for
                    // this packet
                    self.core.trace(TraceLevel::Warning, || {
                        "profile failed to encode, falling back to Uncompressed".to_string()
                    });
                    if created {
                        self.contexts.remove(cid);
                        created = false;
                    }
                    let fallback = profile_index(ProfileId::Uncompressed)
                        .filter(|&idx| self.enabled_profiles[idx]);
                    let unc_idx = match fallback {
                        Some(idx) => idx,
                        None => {
                            self.feedback.unlock_all();
                            return Err(CompressError::InternalEncode {
                                profile_id: PROFILES[profile_idx].id().number(),
                            });
                        }
                    };
                    let (unc_cid, unc_created) =
                        self.find_or_create(unc_idx, 0, &pkt, arrival_secs);
                    cid = unc_cid;
                    created = unc_created;
                    match self.encode_with(unc_idx, unc_cid, &pkt, &mut scratch) {
                        Ok(encoded) => encoded,
                        Err(_) => {
                            if created {
                                self.contexts.remove(cid);
                            }
                            self.feedback.unlock_all();
                            return Err(CompressError::InternalEncode {
                                profile_id: PROFILES[profile_idx].id().number(),
                            });
                        }
                    }
                }
            }
        };

        // 3. append the payload, or stage for segmentation
        let payload = &uncomp[encoded.payload_offset..pkt.total_len()];
        let total_len = feedback_len + encoded.header_len + payload.len();
        let result = if total_len > rohc.len() {
            let rru_len = encoded.header_len + payload.len() + SEGMENT_PROTECTION_LEN;
            if self.core.mrru == 0 || rru_len > self.core.mrru {
                if created {
                    self.contexts.remove(cid);
                }
                self.feedback.unlock_all();
                return Err(CompressError::OutputTooSmall {
                    required_len: total_len,
                    len: rohc.len(),
                    mrru: self.core.mrru,
                });
            }
            if self.segments.pending() {
                self.core.trace(TraceLevel::Warning, || {
                    format!(
                        "dropping a {} byte staged unit that was never retrieved",
                        self.segments.len()
                    )
                });
            }
            self.segments
                .stage(&scratch[..encoded.header_len], payload, &self.core.crc);
            // queued feedback rides the first segment instead
            self.feedback.unlock_all();
            CompressResult::Segment
        } else {
            rohc[feedback_len..feedback_len + encoded.header_len]
                .copy_from_slice(&scratch[..encoded.header_len]);
            rohc[feedback_len + encoded.header_len..total_len].copy_from_slice(payload);
            self.feedback.commit_locked();
            CompressResult::Packet { len: total_len }
        };

        // 4. statistics
        let compressed_len = match result {
            CompressResult::Packet { len } => len,
            CompressResult::Segment => encoded.header_len + payload.len() + SEGMENT_PROTECTION_LEN,
        };
        self.packets_compressed += 1;
        self.total_uncompressed += pkt.total_len() as u64;
        self.total_compressed += compressed_len as u64;
        self.last_cid = Some(cid);
        if let Some(ctx) = self.contexts.get_mut(cid) {
            ctx.latest_used = arrival_secs;
            ctx.last_packet_type = encoded.packet_type;
            ctx.stats.record(
                pkt.total_len(),
                compressed_len,
                encoded.payload_offset,
                encoded.header_len,
            );
            match encoded.packet_type {
                RohcPacketType::Ir => ctx.stats.ir_sent += 1,
                RohcPacketType::IrDyn => ctx.stats.ir_dyn_sent += 1,
                _ => {}
            }
        }
        Ok(result)
    }

    /// Retrieves the next segment of a staged packet.
    pub fn get_segment(&mut self, out: &mut [u8]) -> Result<SegmentResult, SegmentError> {
        if !self.segments.pending() {
            return Err(SegmentError::NoStagedUnit);
        }
        if out.len() < 2 {
            return Err(SegmentError::BufferTooSmall {
                required_len: 2,
                len: out.len(),
            });
        }
        // feedback rides the segments, without the piggyback budget
        let mut len = 0;
        let reserve = out.len() - 2;
        while let Some(written) = self.feedback.drain_one(&mut out[len..reserve]) {
            len += written;
        }
        let (written, is_final) = self.segments.emit(&mut out[len..]);
        len += written;
        if is_final {
            self.feedback.commit_locked();
            Ok(SegmentResult::Last { len })
        } else {
            Ok(SegmentResult::More { len })
        }
    }

    /// Queues feedback data to ride the next outgoing packet.
    pub fn piggyback_feedback(&mut self, feedback: &[u8]) -> Result<(), FeedbackError> {
        if feedback.is_empty() {
            return Err(FeedbackError::TooShort {
                required_len: 1,
                len: 0,
            });
        }
        self.feedback.push(feedback)
    }

    /// Delivers feedback received from the decompressor to the
    /// context it names.
    pub fn deliver_feedback(&mut self, feedback: &[u8]) -> Result<(), FeedbackError> {
        let fb = parse_feedback(feedback, self.core.cid_type)?;
        let core = &self.core;
        let ctx = self
            .contexts
            .get_mut(fb.cid)
            .ok_or(FeedbackError::UnknownCid { cid: fb.cid })?;
        ctx.stats.feedbacks_received += 1;
        PROFILES[ctx.profile_idx].feedback(core, ctx, &fb);
        Ok(())
    }

    /// Writes as much queued feedback as fits into `out` and locks the
    /// emitted entries. Close the transaction with either
    /// [`Compressor::remove_locked_feedback`] (sent successfully) or
    /// [`Compressor::unlock_feedback`] (send failed).
    pub fn flush_feedback(&mut self, out: &mut [u8]) -> usize {
        let mut len = 0;
        while let Some(written) = self.feedback.drain_one(&mut out[len..]) {
            len += written;
        }
        len
    }

    /// Bytes of queued (unlocked) feedback, frame octets included.
    pub fn feedback_avail_bytes(&self) -> usize {
        self.feedback.avail_bytes()
    }

    /// Frees all feedback locked by a flush or compress call.
    pub fn remove_locked_feedback(&mut self) {
        self.feedback.commit_locked();
    }

    /// Unlocks all feedback locked by a flush or compress call so it
    /// is sent again later.
    pub fn unlock_feedback(&mut self) {
        self.feedback.unlock_all();
    }

    /// Moves every live context back to IR state, e.g. after the
    /// channel was re-established.
    pub fn force_contexts_reinit(&mut self) {
        self.core.trace(TraceLevel::Info, || {
            format!(
                "force re-initialization of all {} contexts",
                self.contexts.used_count()
            )
        });
        for ctx in self.contexts.iter_mut() {
            PROFILES[ctx.profile_idx].reinit(ctx);
        }
    }

    /// Information about the most recently compressed packet, if any.
    pub fn last_packet_info(&self) -> Option<LastPacketInfo> {
        let cid = self.last_cid?;
        let ctx = self.contexts.get(cid)?;
        Some(LastPacketInfo {
            cid,
            profile_id: PROFILES[ctx.profile_idx].id(),
            mode: ctx.mode,
            state: ctx.state,
            packet_type: ctx.last_packet_type,
            is_context_init: ctx.stats.packets_sent == 1,
            total_uncompressed_size: ctx.stats.last_total_uncompressed,
            header_uncompressed_size: ctx.stats.last_header_uncompressed,
            total_compressed_size: ctx.stats.last_total_compressed,
            header_compressed_size: ctx.stats.last_header_compressed,
        })
    }

    /// Statistics of the context with the given CID, if it is live.
    pub fn context_info(&self, cid: u16) -> Option<ContextInfo> {
        let ctx = self.contexts.get(cid)?;
        Some(ContextInfo {
            cid,
            profile_id: PROFILES[ctx.profile_idx].id(),
            state: ctx.state,
            mode: ctx.mode,
            active_since_secs: ctx.first_used,
            packets_sent: ctx.stats.packets_sent,
            ir_sent: ctx.stats.ir_sent,
            ir_dyn_sent: ctx.stats.ir_dyn_sent,
            feedbacks_received: ctx.stats.feedbacks_received,
            total_uncompressed_bytes: ctx.stats.total_uncompressed,
            total_compressed_bytes: ctx.stats.total_compressed,
            total_uncompressed_header_bytes: ctx.stats.header_uncompressed,
            total_compressed_header_bytes: ctx.stats.header_compressed,
            mean_packet_size_last_16: ctx.stats.total_16_compressed.mean(),
            mean_header_size_last_16: ctx.stats.header_16_compressed.mean(),
            uncompressed_bytes_last_16: ctx.stats.total_16_uncompressed.sum(),
            compressed_bytes_last_16: ctx.stats.total_16_compressed.sum(),
        })
    }

    /// Aggregate counters of the compressor.
    pub fn general_info(&self) -> GeneralInfo {
        GeneralInfo {
            contexts_used: self.contexts.used_count(),
            packets_compressed: self.packets_compressed,
            uncompressed_bytes: self.total_uncompressed,
            compressed_bytes: self.total_compressed,
        }
    }

    /// First enabled profile accepting the packet, with the flow key
    /// its `matches` computed.
    fn select_profile(&self, pkt: &ParsedPacket<'_>) -> Option<(usize, u64)> {
        for (idx, profile) in PROFILES.iter().enumerate() {
            if !self.enabled_profiles[idx] {
                continue;
            }
            if let Some(key) = profile.matches(&self.core, &self.contexts, pkt) {
                return Some((idx, key));
            }
        }
        None
    }

    /// Finds the context for the flow or creates one (recycling the
    /// LRU slot when the table is full).
    fn find_or_create(
        &mut self,
        profile_idx: usize,
        key: u64,
        pkt: &ParsedPacket<'_>,
        arrival_secs: u64,
    ) -> (u16, bool) {
        if let Some(cid) = self
            .contexts
            .find(profile_idx, key, PROFILES[profile_idx], pkt)
        {
            return (cid, false);
        }
        let (cid, evicted) = self.contexts.pick_slot();
        if evicted {
            self.core.trace(TraceLevel::Debug, || {
                format!("recycled the least recently used context (CID {})", cid)
            });
        }
        let data = PROFILES[profile_idx].create(&self.core, pkt);
        self.contexts
            .insert(Context::new(cid, key, profile_idx, arrival_secs, data));
        self.core.trace(TraceLevel::Debug, || {
            format!(
                "created context CID {} with profile {}",
                cid,
                PROFILES[profile_idx].id()
            )
        });
        (cid, true)
    }

    /// Runs one profile's `encode` with the borrows split between the
    /// shared core and the mutable context.
    fn encode_with(
        &mut self,
        profile_idx: usize,
        cid: u16,
        pkt: &ParsedPacket<'_>,
        scratch: &mut [u8],
    ) -> Result<EncodedHeader, crate::rfc3095::EncodeOutOfSpace> {
        let core = &self.core;
        let ctx = self
            .contexts
            .get_mut(cid)
            .ok_or(crate::rfc3095::EncodeOutOfSpace)?;
        PROFILES[profile_idx].encode(core, ctx, pkt, scratch)
    }
}

impl core::fmt::Debug for Compressor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Compressor")
            .field("cid_type", &self.core.cid_type)
            .field("max_cid", &self.core.max_cid)
            .field("mrru", &self.core.mrru)
            .field("contexts_used", &self.contexts.used_count())
            .field("packets_compressed", &self.packets_compressed)
            .finish()
    }
}
