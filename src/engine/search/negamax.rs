//! Negamax with alpha-beta pruning, principal variation search, null-move
//! pruning, late move reductions, futility pruning, and razoring.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::game_repr::{Move, Position, Type};

use crate::config::{futility_margin, lmr_reduction, SearchConfig};
use crate::engine::evaluation::evaluate;
use crate::engine::move_ordering::{generate_ordered_moves, HistoryTable, KillerMoves};
use crate::engine::pawn_hash::PawnHashTable;
use crate::engine::transposition_table::{NodeType, TranspositionTable};
use crate::engine::zobrist;

use super::quiescence::quiescence;
use super::NodeCounters;

pub const MATE_SCORE: i32 = 30_000;
pub const MIN_SCORE: i32 = -MATE_SCORE - 100;
pub const MAX_SCORE: i32 = MATE_SCORE + 100;

pub fn is_mate_score(score: i32) -> bool {
    score.abs() >= MATE_SCORE - 1000
}

pub fn mate_distance(score: i32) -> Option<i32> {
    if !is_mate_score(score) {
        return None;
    }
    if score > 0 {
        Some((MATE_SCORE - score + 1) / 2)
    } else {
        Some(-(MATE_SCORE + score + 1) / 2)
    }
}

pub struct SearchContext<'a> {
    pub tt: &'a mut TranspositionTable,
    pub pawn_hash: &'a mut PawnHashTable,
    pub killers: &'a mut KillerMoves,
    pub history: &'a mut HistoryTable,
    pub counters: &'a mut NodeCounters,
    pub config: &'a SearchConfig,
    pub start: Instant,
    pub cancel: &'a AtomicBool,
    pub aborted: bool,
}

impl<'a> SearchContext<'a> {
    fn time_expired(&self) -> bool {
        match self.config.time_limit_ms {
            Some(limit) => self.start.elapsed().as_millis() as u64 >= limit,
            None => false,
        }
    }

    fn should_stop(&mut self) -> bool {
        if self.aborted {
            return true;
        }
        if self.cancel.load(Ordering::Relaxed) {
            self.aborted = true;
            return true;
        }
        if self.counters.nodes % self.config.time_check_interval == 0 && self.time_expired() {
            self.aborted = true;
            return true;
        }
        false
    }
}

fn is_capture(pos: &Position, mv: Move) -> bool {
    mv.move_type() == crate::game_repr::MoveType::EnPassant || pos.position[mv._to()].piece_type != Type::None
}

/// Side to move has only king and pawns — null-move pruning is unsound in
/// such zugzwang-prone endgames.
fn is_zugzwang_prone(pos: &Position) -> bool {
    !pos.position.iter().any(|p| {
        p.color == pos.side_to_move && !matches!(p.piece_type, Type::King | Type::Pawn | Type::None)
    })
}

/// Negamax search. Returns the score (from the perspective of the side to
/// move at `pos`) and, when the node wasn't pruned before move generation,
/// the best move found.
pub fn negamax(
    pos: &mut Position,
    hash: u64,
    depth: u8,
    mut alpha: i32,
    beta: i32,
    ply: u32,
    ctx: &mut SearchContext,
) -> (i32, Option<Move>) {
    ctx.counters.nodes += 1;
    ctx.counters.seldepth = ctx.counters.seldepth.max(ply);

    if ctx.should_stop() {
        return (0, None);
    }

    if ply > 0 {
        if pos.is_threefold_repetition() || pos.is_fifty_move_rule() || pos.is_insufficient_material() {
            return (0, None);
        }
    }

    if depth == 0 {
        return (quiescence(pos, alpha, beta, 0, ctx.counters), None);
    }

    let original_alpha = alpha;
    let probe = ctx.tt.probe(hash, depth, alpha, beta, ply);
    let mut hash_move = probe.best_move;
    if probe.hit {
        ctx.counters.tt_hits += 1;
    }
    if let Some(score) = probe.score {
        if probe.cutoff {
            ctx.counters.tt_cutoffs += 1;
            return (score, probe.best_move);
        }
    }
    if hash_move.is_none() {
        hash_move = probe.best_move;
    }

    let in_check = pos.is_in_check(pos.side_to_move);
    let static_eval = evaluate(pos, ctx.pawn_hash);

    // Razoring
    if ctx.config.razoring_enabled
        && depth <= ctx.config.razoring_max_depth
        && !in_check
        && static_eval + ctx.config.razoring_margin <= alpha
    {
        let score = quiescence(pos, alpha, beta, 0, ctx.counters);
        if score <= alpha {
            return (score, None);
        }
    }

    let is_pv = beta - alpha > 1;

    // Futility pruning is applied per-move below; here we just compute
    // whether this node is eligible.
    let futility_eligible =
        ctx.config.futility_enabled && depth <= ctx.config.futility_max_depth && !in_check && !is_pv;

    // Null-move pruning
    if ctx.config.null_move_enabled
        && depth >= ctx.config.null_move_min_depth
        && !in_check
        && !is_pv
        && beta.abs() < MATE_SCORE - 1000
        && !is_zugzwang_prone(pos)
    {
        let reduced_depth = depth.saturating_sub(ctx.config.null_move_reduction + 1);
        let null_hash = hash ^ zobrist::side_to_move_key();
        pos.toggle_side_for_null_move();
        let (null_score, _) = negamax(pos, null_hash, reduced_depth, -beta, -beta + 1, ply + 1, ctx);
        pos.toggle_side_for_null_move();
        if !ctx.aborted && -null_score >= beta {
            ctx.counters.null_move_cutoffs += 1;
            return (beta, None);
        }
    }

    let moves = generate_ordered_moves(pos, hash_move, ctx.killers, ctx.history, ply);

    if moves.is_empty() {
        return if in_check { (-(MATE_SCORE - ply as i32), None) } else { (0, None) };
    }

    let mut best_score = MIN_SCORE;
    let mut best_move = None;
    let mut node_type = NodeType::UpperBound;

    for (move_index, mv) in moves.into_iter().enumerate() {
        let quiet = !is_capture(pos, mv) && !mv.move_type().is_promotion();

        if futility_eligible && quiet && move_index > 0 && static_eval + futility_margin(depth) <= alpha {
            ctx.counters.futility_prunes += 1;
            continue;
        }

        let moved_piece = pos.position[mv._from()];
        let undo = pos.make_move_undoable(mv);
        let child_hash = zobrist::update_after_move(hash, pos, mv, moved_piece, &undo);
        debug_assert_eq!(
            child_hash,
            zobrist::compute(pos),
            "incremental zobrist update diverged from full recompute after {mv:?}"
        );

        let mut reduction = 0u8;
        if ctx.config.lmr_enabled
            && depth >= ctx.config.lmr_min_depth
            && move_index >= ctx.config.lmr_min_move_index
            && quiet
            && !in_check
        {
            reduction = lmr_reduction(depth, move_index);
            ctx.counters.lmr_reductions += 1;
        }

        let score = if move_index == 0 {
            let (s, _) = negamax(pos, child_hash, depth - 1, -beta, -alpha, ply + 1, ctx);
            -s
        } else {
            let reduced_depth = depth.saturating_sub(1 + reduction);
            let (s, _) = negamax(pos, child_hash, reduced_depth, -alpha - 1, -alpha, ply + 1, ctx);
            let mut scout = -s;

            if reduction > 0 && scout > alpha {
                let (s2, _) = negamax(pos, child_hash, depth - 1, -alpha - 1, -alpha, ply + 1, ctx);
                scout = -s2;
            }

            if scout > alpha && scout < beta {
                let (s3, _) = negamax(pos, child_hash, depth - 1, -beta, -alpha, ply + 1, ctx);
                -s3
            } else {
                scout
            }
        };

        pos.unmake_move(mv, undo);

        if ctx.aborted {
            return (0, None);
        }

        if score > best_score {
            best_score = score;
            best_move = Some(mv);
        }

        if score >= beta {
            if quiet {
                ctx.killers.store(ply, mv);
                ctx.history.update(pos.side_to_move as usize, mv, depth);
            }
            ctx.counters.record_cutoff_index(move_index);
            ctx.tt.store(hash, depth, beta, NodeType::LowerBound, Some(mv), ply as u32);
            return (beta, Some(mv));
        }

        if score > alpha {
            alpha = score;
            node_type = NodeType::Exact;
            if quiet {
                ctx.history.update(pos.side_to_move as usize, mv, depth);
            }
        }
    }

    let _ = original_alpha;
    ctx.tt.store(hash, depth, best_score, node_type, best_move, ply as u32);
    (best_score, best_move)
}
