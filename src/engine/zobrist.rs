//! 64-bit Zobrist position hashing: a full recompute from scratch, an
//! incremental update applied alongside a move, and a pawns-only variant
//! for the pawn structure cache. Castling and en-passant deltas are fully
//! incremental here since the native move oracle always exposes exact
//! pre/post state for each applied move.

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::game_repr::{Color, Move, MoveType, Piece, Position, Type, UndoInfo};

/// Fixed seed so hashes are stable across process runs and reproducible
/// across invocations — needed for deterministic search and any persisted
/// TT dump.
const ZOBRIST_SEED: u64 = 0x5EED_C0FF_EE15_2025;

pub struct ZobristKeys {
    /// `pieces[color][piece_type][square]`
    pieces: [[[u64; 64]; 6]; 2],
    side: u64,
    castling: [u64; 4],
    en_passant_file: [u64; 8],
}

fn piece_index(t: Type) -> usize {
    match t {
        Type::Pawn => 0,
        Type::Knight => 1,
        Type::Bishop => 2,
        Type::Rook => 3,
        Type::Queen => 4,
        Type::King => 5,
        Type::None => unreachable!("hashing an empty square"),
    }
}

impl ZobristKeys {
    fn generate() -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
        let mut pieces = [[[0u64; 64]; 6]; 2];
        for color in pieces.iter_mut() {
            for piece in color.iter_mut() {
                for square in piece.iter_mut() {
                    *square = rng.gen();
                }
            }
        }
        let side = rng.gen();
        let mut castling = [0u64; 4];
        for k in castling.iter_mut() {
            *k = rng.gen();
        }
        let mut en_passant_file = [0u64; 8];
        for k in en_passant_file.iter_mut() {
            *k = rng.gen();
        }
        Self { pieces, side, castling, en_passant_file }
    }

    fn piece_key(&self, color: Color, piece_type: Type, square: usize) -> u64 {
        self.pieces[color as usize][piece_index(piece_type)][square]
    }

    /// Castling-right key index: 0=K, 1=Q, 2=k, 3=q, matching
    /// `Position::castling_cond`'s [wK-rook, wQ-rook, wKing, bK-rook,
    /// bQ-rook, bKing] layout collapsed to the four FEN rights.
    fn castling_right_keys(&self, cond: &[bool; 6]) -> u64 {
        let mut h = 0u64;
        if cond[0] && cond[2] {
            h ^= self.castling[0];
        }
        if cond[1] && cond[2] {
            h ^= self.castling[1];
        }
        if cond[3] && cond[5] {
            h ^= self.castling[2];
        }
        if cond[4] && cond[5] {
            h ^= self.castling[3];
        }
        h
    }
}

pub static KEYS: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::generate);

/// The side-to-move toggle key, exposed so null-move pruning can flip a
/// search hash without a full `compute` recompute.
pub fn side_to_move_key() -> u64 {
    KEYS.side
}

/// Full recompute from a position's hash-relevant fields: piece placement,
/// side to move, castling rights, en-passant file. Move counters never
/// affect the hash.
pub fn compute(position: &Position) -> u64 {
    let keys = &*KEYS;
    let mut hash = 0u64;
    for (square, piece) in position.position.iter().enumerate() {
        if piece.piece_type != Type::None {
            hash ^= keys.piece_key(piece.color, piece.piece_type, square);
        }
    }
    if position.side_to_move == Color::Black {
        hash ^= keys.side;
    }
    hash ^= keys.castling_right_keys(&position.castling_cond);
    if let Some(ep) = position.en_passant {
        hash ^= keys.en_passant_file[(ep % 8) as usize];
    }
    hash
}

/// Incrementally updates `hash` for a move just applied to `position`
/// (i.e. called *after* `Position::make_move_undoable`, with `undo`
/// carrying the pre-move state and `position` the post-move state).
pub fn update_after_move(hash: u64, position: &Position, mv: Move, moved_piece_before: Piece, undo: &UndoInfo) -> u64 {
    let keys = &*KEYS;
    let mut h = hash;
    let from = mv._from();
    let to = mv._to();
    let move_type = mv.move_type();
    let color = moved_piece_before.color;

    // Moving piece leaves `from`.
    h ^= keys.piece_key(color, moved_piece_before.piece_type, from);

    // Captured piece (if any) leaves its actual square.
    if !undo.captured.is_none() {
        h ^= keys.piece_key(undo.captured.color, undo.captured.piece_type, undo.captured_square);
    }

    // Moving (or promoted) piece arrives at `to`.
    let arriving_type = move_type.promoted_type().unwrap_or(moved_piece_before.piece_type);
    h ^= keys.piece_key(color, arriving_type, to);

    if move_type == MoveType::Castling {
        let is_kingside = to > from;
        let (rook_from, rook_to) = match (color, is_kingside) {
            (Color::White, true) => (7, 5),
            (Color::White, false) => (0, 3),
            (Color::Black, true) => (63, 61),
            (Color::Black, false) => (56, 59),
        };
        h ^= keys.piece_key(color, Type::Rook, rook_from);
        h ^= keys.piece_key(color, Type::Rook, rook_to);
    }

    h ^= keys.side;

    h ^= keys.castling_right_keys(&undo.prev_castling);
    h ^= keys.castling_right_keys(&position.castling_cond);

    if let Some(prev_ep) = undo.prev_en_passant {
        h ^= keys.en_passant_file[(prev_ep % 8) as usize];
    }
    if let Some(new_ep) = position.en_passant {
        h ^= keys.en_passant_file[(new_ep % 8) as usize];
    }

    h
}

/// Hash over pawns only (ignoring side to move, castling, en passant),
/// used to key the pawn structure cache independently of the main
/// position hash.
pub fn pawn_hash(position: &Position) -> u64 {
    let keys = &*KEYS;
    let mut hash = 0u64;
    for (square, piece) in position.position.iter().enumerate() {
        if piece.piece_type == Type::Pawn {
            hash ^= keys.piece_key(piece.color, Type::Pawn, square);
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_repr::MoveType;

    #[test]
    fn compute_is_deterministic() {
        let pos = Position::default();
        assert_eq!(compute(&pos), compute(&pos));
    }

    #[test]
    fn hash_ignores_move_counters() {
        let mut a = Position::default();
        let mut b = Position::default();
        a.halfmove_clock = 0;
        b.halfmove_clock = 40;
        assert_eq!(compute(&a), compute(&b));
    }

    #[test]
    fn different_side_to_move_changes_hash() {
        let white = Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        let black = Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1").unwrap();
        assert_ne!(compute(&white), compute(&black));
    }

    #[test]
    fn incremental_update_matches_full_recompute_for_quiet_move() {
        let mut pos = Position::default();
        let before_hash = compute(&pos);
        let mv = pos.legal_moves(12)[0]; // e2 pawn push
        let moved_piece = pos.position[mv._from()];
        let undo = pos.make_move_undoable(mv);
        let incremental = update_after_move(before_hash, &pos, mv, moved_piece, &undo);
        assert_eq!(incremental, compute(&pos));
        let _ = MoveType::Normal;
    }

    #[test]
    fn incremental_update_matches_full_recompute_for_castling() {
        let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let before_hash = compute(&pos);
        let mv = pos
            .king_moves(4)
            .into_iter()
            .find(|m| m.move_type() == MoveType::Castling && m._to() == 6)
            .unwrap();
        let moved_piece = pos.position[mv._from()];
        let undo = pos.make_move_undoable(mv);
        let incremental = update_after_move(before_hash, &pos, mv, moved_piece, &undo);
        assert_eq!(incremental, compute(&pos));
    }

    #[test]
    fn pawn_hash_ignores_non_pawn_material() {
        let with_queen = Position::from_fen("4k3/8/8/8/8/8/8/4KQ2 w - - 0 1").unwrap();
        let without_queen = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(pawn_hash(&with_queen), pawn_hash(&without_queen));
    }

    #[test]
    fn pawn_hash_changes_when_a_pawn_moves() {
        let mut pos = Position::default();
        let before = pawn_hash(&pos);
        let mv = pos.legal_moves(12)[0];
        pos.mk_move(mv);
        assert_ne!(pawn_hash(&pos), before);
    }

    #[test]
    fn incremental_update_matches_full_recompute_for_en_passant() {
        let mut pos = Position::from_fen("rnbqkbnr/pp1ppppp/8/8/2pP4/8/PPP1PPPP/RNBQKBNR b KQkq d3 0 1").unwrap();
        let before_hash = compute(&pos);
        let mv = pos
            .legal_moves(26)
            .into_iter()
            .find(|m| m.move_type() == MoveType::EnPassant)
            .unwrap();
        let moved_piece = pos.position[mv._from()];
        let undo = pos.make_move_undoable(mv);
        let incremental = update_after_move(before_hash, &pos, mv, moved_piece, &undo);
        assert_eq!(incremental, compute(&pos));
    }
}
