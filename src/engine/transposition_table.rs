//! Fixed-size bucketed transposition table.
//!
//! The table is a `Vec<Bucket>` sized once from a byte budget, rounded
//! down to a power of two so hash-to-bucket indexing is a mask instead of a
//! modulo, with 4 slots per bucket and a depth/age replacement policy.

use crate::game_repr::Move;

/// How a stored score relates to the true minimax value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Exact,
    LowerBound,
    UpperBound,
}

const MATE_THRESHOLD: i32 = 29_000;

fn adjust_mate_score_for_store(score: i32, ply: u32) -> i32 {
    if score > MATE_THRESHOLD {
        score + ply as i32
    } else if score < -MATE_THRESHOLD {
        score - ply as i32
    } else {
        score
    }
}

fn adjust_mate_score_for_read(score: i32, ply: u32) -> i32 {
    if score > MATE_THRESHOLD {
        score - ply as i32
    } else if score < -MATE_THRESHOLD {
        score + ply as i32
    } else {
        score
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    occupied: bool,
    hash: u64,
    depth: u8,
    score: i32,
    best_move: Option<Move>,
    node_type: NodeType,
    age: u8,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            occupied: false,
            hash: 0,
            depth: 0,
            score: 0,
            best_move: None,
            node_type: NodeType::Exact,
            age: 0,
        }
    }
}

/// Priority used to pick an eviction victim: lower is evicted first.
fn replacement_priority(slot: &Slot, current_age: u8) -> (u8, u8) {
    let age_gap = current_age.wrapping_sub(slot.age);
    // Older entries (bigger age_gap) and shallower entries are evicted
    // first, so rank by depth first and invert the age gap into the
    // comparison by subtracting it from a ceiling.
    (slot.depth, 255u8.saturating_sub(age_gap))
}

const SLOTS_PER_BUCKET: usize = 4;

#[derive(Clone, Copy)]
struct Bucket([Slot; SLOTS_PER_BUCKET]);

impl Default for Bucket {
    fn default() -> Self {
        Bucket([Slot::default(); SLOTS_PER_BUCKET])
    }
}

pub struct ProbeResult {
    pub score: Option<i32>,
    pub best_move: Option<Move>,
    pub hit: bool,
    pub cutoff: bool,
}

pub struct TranspositionTable {
    buckets: Vec<Bucket>,
    mask: usize,
    age: u8,
    pub hits: u64,
    pub misses: u64,
}

const DEFAULT_BYTES: usize = 64 * 1024 * 1024;
const BUCKET_SIZE_BYTES: usize = std::mem::size_of::<Bucket>();

impl TranspositionTable {
    pub fn new() -> Self {
        Self::with_capacity_bytes(DEFAULT_BYTES)
    }

    /// Sizes the table from a byte budget, rounding the bucket count down
    /// to a power of two (minimum one bucket).
    pub fn with_capacity_bytes(bytes: usize) -> Self {
        let requested_buckets = (bytes / BUCKET_SIZE_BYTES).max(1);
        let num_buckets = requested_buckets.next_power_of_two().max(1);
        let num_buckets = if num_buckets > requested_buckets && num_buckets > 1 {
            num_buckets / 2
        } else {
            num_buckets
        };
        let num_buckets = num_buckets.max(1);
        Self {
            buckets: vec![Bucket::default(); num_buckets],
            mask: num_buckets - 1,
            age: 0,
            hits: 0,
            misses: 0,
        }
    }

    fn bucket_index(&self, hash: u64) -> usize {
        (hash as usize) & self.mask
    }

    /// Bumps the age counter; call once per new search root so stale
    /// entries from prior searches lose replacement priority.
    pub fn new_search(&mut self) {
        self.age = self.age.wrapping_add(1);
    }

    pub fn probe(&mut self, hash: u64, depth: u8, alpha: i32, beta: i32, ply: u32) -> ProbeResult {
        let bucket = &self.buckets[self.bucket_index(hash)];
        let Some(slot) = bucket.0.iter().find(|s| s.occupied && s.hash == hash) else {
            self.misses += 1;
            return ProbeResult { score: None, best_move: None, hit: false, cutoff: false };
        };
        self.hits += 1;

        if slot.depth < depth {
            return ProbeResult { score: None, best_move: slot.best_move, hit: true, cutoff: false };
        }

        let score = adjust_mate_score_for_read(slot.score, ply);
        let cutoff = match slot.node_type {
            NodeType::Exact => true,
            NodeType::LowerBound => score >= beta,
            NodeType::UpperBound => score <= alpha,
        };

        if cutoff {
            ProbeResult { score: Some(score), best_move: slot.best_move, hit: true, cutoff: true }
        } else {
            ProbeResult { score: None, best_move: slot.best_move, hit: true, cutoff: false }
        }
    }

    pub fn store(
        &mut self,
        hash: u64,
        depth: u8,
        score: i32,
        node_type: NodeType,
        best_move: Option<Move>,
        ply: u32,
    ) {
        let age = self.age;
        let idx = self.bucket_index(hash);
        let bucket = &mut self.buckets[idx];

        let target = bucket
            .0
            .iter_mut()
            .find(|s| !s.occupied || s.hash == hash)
            .or_else(|| {
                bucket
                    .0
                    .iter_mut()
                    .min_by_key(|s| replacement_priority(s, age))
            })
            .expect("bucket always has at least one slot");

        *target = Slot {
            occupied: true,
            hash,
            depth,
            score: adjust_mate_score_for_store(score, ply),
            best_move,
            node_type,
            age,
        };
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = Bucket::default();
        }
        self.age = self.age.wrapping_add(1);
        self.hits = 0;
        self.misses = 0;
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Fraction of slots currently occupied, in permille (0..1000) — the
    /// conventional UCI `hashfull` scale.
    pub fn filled_permille(&self) -> u32 {
        let total = self.buckets.len() * SLOTS_PER_BUCKET;
        if total == 0 {
            return 0;
        }
        let occupied: usize = self.buckets.iter().map(|b| b.0.iter().filter(|s| s.occupied).count()).sum();
        ((occupied * 1000) / total) as u32
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_repr::MoveType;

    #[test]
    fn bucket_count_is_power_of_two() {
        let tt = TranspositionTable::with_capacity_bytes(1_000_000);
        assert!(tt.num_buckets().is_power_of_two());
    }

    #[test]
    fn store_then_probe_round_trips() {
        let mut tt = TranspositionTable::with_capacity_bytes(1 << 20);
        let mv = Move::new(12, 28, MoveType::Normal);
        tt.store(0xABCD, 5, 120, NodeType::Exact, Some(mv), 0);

        let result = tt.probe(0xABCD, 5, -1000, 1000, 0);
        assert!(result.hit);
        assert!(result.cutoff);
        assert_eq!(result.score, Some(120));
        assert_eq!(result.best_move, Some(mv));
    }

    #[test]
    fn shallower_stored_entry_is_not_cutoff_but_still_yields_move() {
        let mut tt = TranspositionTable::with_capacity_bytes(1 << 20);
        let mv = Move::new(12, 28, MoveType::Normal);
        tt.store(0xABCD, 2, 120, NodeType::Exact, Some(mv), 0);

        let result = tt.probe(0xABCD, 5, -1000, 1000, 0);
        assert!(result.hit);
        assert!(!result.cutoff);
        assert_eq!(result.best_move, Some(mv));
    }

    #[test]
    fn lower_bound_cuts_off_only_above_beta() {
        let mut tt = TranspositionTable::with_capacity_bytes(1 << 20);
        tt.store(1, 5, 50, NodeType::LowerBound, None, 0);

        assert!(!tt.probe(1, 5, -1000, 40, 0).cutoff);
        assert!(tt.probe(1, 5, -1000, 60, 0).cutoff);
    }

    #[test]
    fn mate_score_is_ply_adjusted_on_store_and_read() {
        let mut tt = TranspositionTable::with_capacity_bytes(1 << 20);
        let mate_score = 29_500;
        tt.store(7, 5, mate_score, NodeType::Exact, None, 3);
        let result = tt.probe(7, 5, -100_000, 100_000, 10);
        // Stored as mate_score + 3 (write), read back as stored - 10 (read at
        // a different ply) == mate_score + 3 - 10.
        assert_eq!(result.score, Some(mate_score + 3 - 10));
    }

    #[test]
    fn replacement_prefers_empty_slot_before_evicting() {
        let mut tt = TranspositionTable::with_capacity_bytes(BUCKET_SIZE_BYTES);
        assert_eq!(tt.num_buckets(), 1);
        for i in 0..SLOTS_PER_BUCKET as u64 {
            tt.store(i, 1, 0, NodeType::Exact, None, 0);
        }
        for i in 0..SLOTS_PER_BUCKET as u64 {
            assert!(tt.probe(i, 1, -1, 1, 0).hit);
        }
    }

    #[test]
    fn deeper_entry_evicts_shallower_one_when_bucket_is_full() {
        let mut tt = TranspositionTable::with_capacity_bytes(BUCKET_SIZE_BYTES);
        for i in 0..SLOTS_PER_BUCKET as u64 {
            tt.store(i, 1, 0, NodeType::Exact, None, 0);
        }
        // One more distinct hash with much greater depth should evict one of
        // the shallow entries rather than being silently dropped.
        tt.store(999, 20, 0, NodeType::Exact, None, 0);
        assert!(tt.probe(999, 20, -1, 1, 0).hit);
    }

    #[test]
    fn clear_resets_stats_and_entries() {
        let mut tt = TranspositionTable::with_capacity_bytes(1 << 20);
        tt.store(1, 5, 0, NodeType::Exact, None, 0);
        tt.probe(1, 5, -1, 1, 0);
        tt.clear();
        assert_eq!(tt.hits, 0);
        assert_eq!(tt.misses, 0);
        assert!(!tt.probe(1, 5, -1, 1, 0).hit);
    }
}
