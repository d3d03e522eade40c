//! Iterative-deepening driver: aspiration windows, time control, and
//! principal variation extraction layered over the `SearchContext`-based
//! `negamax` core.

use std::sync::atomic::AtomicBool;
use std::time::Instant;

use crate::game_repr::{Move, Position};

use crate::config::SearchConfig;
use crate::engine::move_ordering::{HistoryTable, KillerMoves};
use crate::engine::pawn_hash::PawnHashTable;
use crate::engine::transposition_table::TranspositionTable;
use crate::engine::zobrist;

use super::negamax::{negamax, SearchContext, MAX_SCORE, MIN_SCORE};
use super::NodeCounters;

const MAX_ASPIRATION_WIDENINGS: u32 = 4;

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub score: i32,
    pub depth: u8,
    pub seldepth: u32,
    pub nodes: u64,
    pub nps: u64,
    pub pv: Vec<Move>,
    pub ponder_move: Option<Move>,
    pub aborted: bool,
    /// Transposition table fill ratio in permille (0..1000) at the end of
    /// the search.
    pub hash_full: u32,
}

/// Walks the TT's chain of exact best moves from `pos` to reconstruct the
/// principal variation, replaying moves on a scratch clone.
fn extract_pv(pos: &Position, tt: &mut TranspositionTable, max_len: usize) -> Vec<Move> {
    let mut pv = Vec::new();
    let mut scratch = pos.clone();
    let mut hash = zobrist::compute(&scratch);

    for _ in 0..max_len {
        let probe = tt.probe(hash, 0, MIN_SCORE, MAX_SCORE, 0);
        let Some(mv) = probe.best_move else { break };
        if !scratch.all_legal_moves().contains(&mv) {
            break;
        }
        let moved_piece = scratch.position[mv._from()];
        let undo = scratch.make_move_undoable(mv);
        hash = zobrist::update_after_move(hash, &scratch, mv, moved_piece, &undo);
        pv.push(mv);
    }
    pv
}

/// Runs iterative deepening from `pos` up to `config.max_depth` (or until
/// the time budget or `cancel` flag stops it), returning the best move from
/// the deepest completed iteration.
pub fn search(
    pos: &Position,
    config: &SearchConfig,
    cancel: &AtomicBool,
    tt: &mut TranspositionTable,
    pawn_hash: &mut PawnHashTable,
    killers: &mut KillerMoves,
    history: &mut HistoryTable,
) -> SearchResult {
    let start = Instant::now();
    tt.new_search();
    killers.clear();

    let mut result = SearchResult {
        best_move: None,
        score: 0,
        depth: 0,
        seldepth: 0,
        nodes: 0,
        nps: 0,
        pv: Vec::new(),
        ponder_move: None,
        aborted: false,
        hash_full: 0,
    };

    let mut prev_score = 0i32;
    let max_depth = config.max_depth.max(1);

    for depth in 1..=max_depth {
        let mut search_pos = pos.clone();
        let hash = zobrist::compute(&search_pos);
        let mut counters = NodeCounters::default();

        let (mut alpha, mut beta) = if depth >= config.aspiration_min_depth {
            (prev_score - config.aspiration_window, prev_score + config.aspiration_window)
        } else {
            (MIN_SCORE, MAX_SCORE)
        };

        let mut widenings = 0u32;
        let (score, best_move) = loop {
            let mut ctx = SearchContext {
                tt,
                pawn_hash,
                killers,
                history,
                counters: &mut counters,
                config,
                start,
                cancel,
                aborted: false,
            };
            let (score, best_move) = negamax(&mut search_pos, hash, depth, alpha, beta, 0, &mut ctx);

            if ctx.aborted {
                result.aborted = true;
                break (score, best_move);
            }

            let failed_low = score <= alpha;
            let failed_high = score >= beta;
            if !failed_low && !failed_high {
                break (score, best_move);
            }
            if widenings >= MAX_ASPIRATION_WIDENINGS {
                alpha = MIN_SCORE;
                beta = MAX_SCORE;
                widenings += 1;
                continue;
            }
            if failed_low {
                alpha -= config.aspiration_window * (1 << (widenings + 1));
            }
            if failed_high {
                beta += config.aspiration_window * (1 << (widenings + 1));
            }
            widenings += 1;
        };

        result.nodes += counters.nodes + counters.qnodes;

        if result.aborted {
            break;
        }

        result.depth = depth;
        result.seldepth = counters.seldepth;
        result.score = score;
        result.best_move = best_move.or(result.best_move);
        prev_score = score;

        let elapsed_ms = start.elapsed().as_millis().max(1) as u64;
        result.nps = result.nodes * 1000 / elapsed_ms;

        log::debug!(
            "depth {} score {} nodes {} nps {} best {:?}",
            depth,
            score,
            result.nodes,
            result.nps,
            result.best_move
        );

        if let Some(limit) = config.time_limit_ms {
            if start.elapsed().as_millis() as u64 >= limit {
                break;
            }
        }
    }

    result.pv = extract_pv(pos, tt, max_depth as usize);
    result.ponder_move = result.pv.get(1).copied();
    result.hash_full = tt.filled_permille();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_repr::MoveType;

    #[test]
    fn finds_mate_in_one_via_iterative_deepening() {
        let mut pos = Position::default();
        pos.mk_move(Move::new(13, 21, MoveType::Normal));
        pos.mk_move(Move::new(52, 36, MoveType::Normal));
        pos.mk_move(Move::new(14, 30, MoveType::Normal));
        pos.mk_move(Move::new(59, 31, MoveType::Normal));

        let mut tt = TranspositionTable::new();
        let mut pawn_hash = PawnHashTable::new();
        let mut killers = KillerMoves::new();
        let mut history = HistoryTable::new();
        let cancel = AtomicBool::new(false);
        let config = SearchConfig { max_depth: 2, ..SearchConfig::default() };

        let result = search(&pos, &config, &cancel, &mut tt, &mut pawn_hash, &mut killers, &mut history);
        assert!(super::super::negamax::is_mate_score(result.score));
        assert!(result.score < 0);
    }

    #[test]
    fn returns_a_move_from_starting_position() {
        let pos = Position::default();
        let mut tt = TranspositionTable::new();
        let mut pawn_hash = PawnHashTable::new();
        let mut killers = KillerMoves::new();
        let mut history = HistoryTable::new();
        let cancel = AtomicBool::new(false);
        let config = SearchConfig { max_depth: 3, ..SearchConfig::default() };

        let result = search(&pos, &config, &cancel, &mut tt, &mut pawn_hash, &mut killers, &mut history);
        assert!(result.best_move.is_some());
        assert_eq!(result.depth, 3);
        assert!(!result.aborted);
    }

    #[test]
    fn deterministic_across_repeated_runs() {
        let pos = Position::default();
        let config = SearchConfig { max_depth: 3, ..SearchConfig::default() };

        let mut tt1 = TranspositionTable::new();
        let mut pawn_hash1 = PawnHashTable::new();
        let mut k1 = KillerMoves::new();
        let mut h1 = HistoryTable::new();
        let cancel1 = AtomicBool::new(false);
        let r1 = search(&pos, &config, &cancel1, &mut tt1, &mut pawn_hash1, &mut k1, &mut h1);

        let mut tt2 = TranspositionTable::new();
        let mut pawn_hash2 = PawnHashTable::new();
        let mut k2 = KillerMoves::new();
        let mut h2 = HistoryTable::new();
        let cancel2 = AtomicBool::new(false);
        let r2 = search(&pos, &config, &cancel2, &mut tt2, &mut pawn_hash2, &mut k2, &mut h2);

        assert_eq!(r1.best_move, r2.best_move);
        assert_eq!(r1.score, r2.score);
    }

    #[test]
    fn cancellation_flag_aborts_search() {
        let pos = Position::default();
        let mut tt = TranspositionTable::new();
        let mut pawn_hash = PawnHashTable::new();
        let mut killers = KillerMoves::new();
        let mut history = HistoryTable::new();
        let cancel = AtomicBool::new(true);
        let config = SearchConfig { max_depth: 10, ..SearchConfig::default() };

        let result = search(&pos, &config, &cancel, &mut tt, &mut pawn_hash, &mut killers, &mut history);
        assert!(result.aborted);
    }
}
