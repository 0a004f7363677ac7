//! Per-flow compression contexts and the bounded table holding them.

use crate::profiles::Profile;
use crate::rfc3095::Rfc3095Ctxt;
use crate::stats::ContextStats;
use crate::{ContextState, OperatingMode, ParsedPacket, RohcPacketType};

/// State of the Uncompressed profile: a short IR phase, then Normal
/// packets.
#[derive(Clone, Debug, Default)]
pub(crate) struct UncompressedCtxt {
    pub ir_count: u32,
    pub refresh_ir_count: u32,
}

/// Profile specific payload of a context.
#[derive(Clone, Debug)]
pub(crate) enum ProfileData {
    Uncompressed(UncompressedCtxt),
    Rfc3095(Box<Rfc3095Ctxt>),
}

impl ProfileData {
    pub(crate) fn rfc3095(&self) -> Option<&Rfc3095Ctxt> {
        match self {
            ProfileData::Rfc3095(ctxt) => Some(ctxt),
            ProfileData::Uncompressed(_) => None,
        }
    }

    pub(crate) fn rfc3095_mut(&mut self) -> Option<&mut Rfc3095Ctxt> {
        match self {
            ProfileData::Rfc3095(ctxt) => Some(ctxt),
            ProfileData::Uncompressed(_) => None,
        }
    }

    pub(crate) fn uncompressed_mut(&mut self) -> Option<&mut UncompressedCtxt> {
        match self {
            ProfileData::Uncompressed(ctxt) => Some(ctxt),
            ProfileData::Rfc3095(_) => None,
        }
    }
}

/// One per-flow compression context.
#[derive(Clone, Debug)]
pub(crate) struct Context {
    pub cid: u16,
    /// Flow fingerprint computed by the matching profile, used to
    /// prune the lookup scan.
    pub key: u64,
    /// Position of the owning profile in the registry.
    pub profile_idx: usize,
    pub state: ContextState,
    pub mode: OperatingMode,
    /// Arrival second of the packet that created the context.
    pub first_used: u64,
    /// Arrival second of the most recent packet.
    pub latest_used: u64,
    pub last_packet_type: RohcPacketType,
    pub stats: ContextStats,
    pub data: ProfileData,
}

impl Context {
    pub(crate) fn new(
        cid: u16,
        key: u64,
        profile_idx: usize,
        arrival_secs: u64,
        data: ProfileData,
    ) -> Context {
        Context {
            cid,
            key,
            profile_idx,
            state: ContextState::Ir,
            mode: OperatingMode::Unidirectional,
            first_used: arrival_secs,
            latest_used: arrival_secs,
            last_packet_type: RohcPacketType::Ir,
            stats: ContextStats::default(),
            data,
        }
    }
}

/// Dense array of MAX_CID + 1 context slots with LRU recycling.
#[derive(Debug, Default)]
pub(crate) struct ContextTable {
    slots: Vec<Option<Context>>,
    used: usize,
}

impl ContextTable {
    pub(crate) fn new(slot_count: usize) -> ContextTable {
        ContextTable {
            slots: (0..slot_count).map(|_| None).collect(),
            used: 0,
        }
    }

    pub(crate) fn used_count(&self) -> usize {
        self.used
    }

    pub(crate) fn get(&self, cid: u16) -> Option<&Context> {
        self.slots.get(usize::from(cid)).and_then(|s| s.as_ref())
    }

    pub(crate) fn get_mut(&mut self, cid: u16) -> Option<&mut Context> {
        self.slots.get_mut(usize::from(cid)).and_then(|s| s.as_mut())
    }

    pub(crate) fn slots(&self) -> &[Option<Context>] {
        &self.slots
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Context> {
        self.slots.iter_mut().filter_map(|s| s.as_mut())
    }

    /// Looks a context up by profile, flow key and the profile's own
    /// flow identity test. The scan stops once every used slot was
    /// seen.
    pub(crate) fn find(
        &self,
        profile_idx: usize,
        key: u64,
        profile: &dyn Profile,
        pkt: &ParsedPacket<'_>,
    ) -> Option<u16> {
        let mut seen = 0;
        for slot in &self.slots {
            let ctx = match slot {
                Some(ctx) => ctx,
                None => continue,
            };
            seen += 1;
            if ctx.profile_idx == profile_idx
                && ctx.key == key
                && profile.check_context(ctx, pkt)
            {
                return Some(ctx.cid);
            }
            if seen >= self.used {
                break;
            }
        }
        None
    }

    /// Picks the CID for a new context: the first free slot, or the
    /// least recently used one (whose context is dropped).
    pub(crate) fn pick_slot(&mut self) -> (u16, bool) {
        if self.used < self.slots.len() {
            let cid = self
                .slots
                .iter()
                .position(|s| s.is_none())
                .unwrap_or(0) as u16;
            (cid, false)
        } else {
            let mut oldest = u64::MAX;
            let mut cid = 0u16;
            for slot in self.slots.iter().flatten() {
                if slot.latest_used < oldest {
                    oldest = slot.latest_used;
                    cid = slot.cid;
                }
            }
            self.remove(cid);
            (cid, true)
        }
    }

    pub(crate) fn insert(&mut self, ctx: Context) {
        let idx = usize::from(ctx.cid);
        if self.slots[idx].is_none() {
            self.used += 1;
        }
        self.slots[idx] = Some(ctx);
    }

    pub(crate) fn remove(&mut self, cid: u16) {
        if let Some(slot) = self.slots.get_mut(usize::from(cid)) {
            if slot.take().is_some() {
                self.used -= 1;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dummy_context(cid: u16, latest_used: u64) -> Context {
        Context::new(
            cid,
            0,
            0,
            latest_used,
            ProfileData::Uncompressed(UncompressedCtxt::default()),
        )
    }

    #[test]
    fn used_count_tracks_inserts_and_removes() {
        let mut table = ContextTable::new(4);
        assert_eq!(0, table.used_count());
        table.insert(dummy_context(0, 1));
        table.insert(dummy_context(2, 2));
        assert_eq!(2, table.used_count());
        table.remove(0);
        assert_eq!(1, table.used_count());
        // removing an empty slot changes nothing
        table.remove(0);
        assert_eq!(1, table.used_count());
    }

    #[test]
    fn pick_slot_prefers_free_slots() {
        let mut table = ContextTable::new(3);
        table.insert(dummy_context(0, 10));
        let (cid, evicted) = table.pick_slot();
        assert_eq!(1, cid);
        assert!(!evicted);
    }

    #[test]
    fn full_table_evicts_least_recently_used() {
        let mut table = ContextTable::new(3);
        table.insert(dummy_context(0, 30));
        table.insert(dummy_context(1, 10));
        table.insert(dummy_context(2, 20));
        let (cid, evicted) = table.pick_slot();
        assert_eq!(1, cid);
        assert!(evicted);
        assert_eq!(2, table.used_count());
    }
}
