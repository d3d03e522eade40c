//! Pawn structure cache: a small, direct-mapped, open-addressed table
//! keyed by a pawns-only Zobrist hash, separate from the main
//! transposition table. Pawn structure changes only on pawn moves and
//! captures, so it's worth caching independently of the rest of the
//! position.

use super::evaluation::TaperedScore;

/// Both colors' pawn structure score for one pawn arrangement, cached
/// together since computing one costs almost nothing once the board has
/// been scanned for the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct PawnEval {
    pub white: TaperedScore,
    pub black: TaperedScore,
}

#[derive(Clone, Copy)]
struct Slot {
    occupied: bool,
    key: u64,
    eval: PawnEval,
}

impl Default for Slot {
    fn default() -> Self {
        Self { occupied: false, key: 0, eval: PawnEval::default() }
    }
}

pub struct PawnHashTable {
    slots: Vec<Slot>,
    mask: usize,
    pub hits: u64,
    pub misses: u64,
}

const DEFAULT_BYTES: usize = 2 * 1024 * 1024;
const SLOT_SIZE_BYTES: usize = std::mem::size_of::<Slot>();

impl PawnHashTable {
    pub fn new() -> Self {
        Self::with_capacity_bytes(DEFAULT_BYTES)
    }

    pub fn with_capacity_bytes(bytes: usize) -> Self {
        let requested_slots = (bytes / SLOT_SIZE_BYTES).max(1);
        let num_slots = requested_slots.next_power_of_two().max(1);
        let num_slots = if num_slots > requested_slots && num_slots > 1 {
            num_slots / 2
        } else {
            num_slots
        };
        let num_slots = num_slots.max(1);
        Self {
            slots: vec![Slot::default(); num_slots],
            mask: num_slots - 1,
            hits: 0,
            misses: 0,
        }
    }

    fn index(&self, key: u64) -> usize {
        (key as usize) & self.mask
    }

    pub fn probe(&mut self, key: u64) -> Option<PawnEval> {
        let slot = &self.slots[self.index(key)];
        if slot.occupied && slot.key == key {
            self.hits += 1;
            Some(slot.eval)
        } else {
            self.misses += 1;
            None
        }
    }

    /// Always overwrites whatever occupied the slot — direct-mapped, no
    /// replacement policy beyond last-write-wins.
    pub fn store(&mut self, key: u64, eval: PawnEval) {
        let idx = self.index(key);
        self.slots[idx] = Slot { occupied: true, key, eval };
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::default();
        }
        self.hits = 0;
        self.misses = 0;
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }
}

impl Default for PawnHashTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_count_is_power_of_two() {
        let table = PawnHashTable::with_capacity_bytes(1_000_000);
        assert!(table.num_slots().is_power_of_two());
    }

    #[test]
    fn store_then_probe_round_trips() {
        let mut table = PawnHashTable::with_capacity_bytes(1 << 16);
        let eval = PawnEval { white: TaperedScore { mg: 12, eg: 8 }, black: TaperedScore { mg: -4, eg: -2 } };
        table.store(0xABCD, eval);

        let probed = table.probe(0xABCD).unwrap();
        assert_eq!(probed.white.mg, 12);
        assert_eq!(probed.black.eg, -2);
    }

    #[test]
    fn miss_on_unseen_key() {
        let mut table = PawnHashTable::with_capacity_bytes(1 << 16);
        assert!(table.probe(42).is_none());
    }

    #[test]
    fn clear_resets_stats_and_entries() {
        let mut table = PawnHashTable::with_capacity_bytes(1 << 16);
        table.store(1, PawnEval::default());
        table.probe(1);
        table.clear();
        assert_eq!(table.hits, 0);
        assert_eq!(table.misses, 0);
        assert!(table.probe(1).is_none());
    }
}
