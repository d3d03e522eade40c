//! Move ordering heuristics: hash move, MVV-LVA captures, killers, history.

use crate::game_repr::{Move, MoveType, Position, Type};
use smallvec::SmallVec;

/// Two killer moves per ply, the most recent beta-cutoff quiets at that ply.
pub struct KillerMoves {
    table: [[Option<Move>; 2]; 64],
}

impl KillerMoves {
    pub fn new() -> Self {
        Self { table: [[None; 2]; 64] }
    }

    pub fn store(&mut self, ply: u32, mv: Move) {
        let d = (ply as usize).min(63);
        if self.table[d][0] != Some(mv) {
            self.table[d][1] = self.table[d][0];
            self.table[d][0] = Some(mv);
        }
    }

    pub fn is_killer(&self, ply: u32, mv: Move) -> bool {
        let d = (ply as usize).min(63);
        self.table[d][0] == Some(mv) || self.table[d][1] == Some(mv)
    }

    pub fn clear(&mut self) {
        self.table = [[None; 2]; 64];
    }
}

impl Default for KillerMoves {
    fn default() -> Self {
        Self::new()
    }
}

/// History scores indexed by `[color][from][to]`, per `depth²` on a
/// beta-cutoff quiet move.
pub struct HistoryTable {
    table: [[[i32; 64]; 64]; 2],
}

impl HistoryTable {
    pub fn new() -> Self {
        Self { table: [[[0; 64]; 64]; 2] }
    }

    pub fn update(&mut self, color_idx: usize, mv: Move, depth: u8) {
        self.table[color_idx][mv._from()][mv._to()] += (depth as i32) * (depth as i32);
    }

    pub fn score(&self, color_idx: usize, mv: Move) -> i32 {
        self.table[color_idx][mv._from()][mv._to()]
    }

    pub fn clear(&mut self) {
        self.table = [[[0; 64]; 64]; 2];
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

pub fn piece_value(piece_type: Type) -> i32 {
    match piece_type {
        Type::Pawn => 1,
        Type::Knight => 3,
        Type::Bishop => 3,
        Type::Rook => 5,
        Type::Queen => 9,
        Type::King => 0,
        Type::None => 0,
    }
}

/// Generates legal moves ordered: TT move, then MVV-LVA captures, then
/// promotions, then killers, then history-ranked quiets.
pub fn generate_ordered_moves(
    pos: &Position,
    hash_move: Option<Move>,
    killers: &KillerMoves,
    history: &HistoryTable,
    ply: u32,
) -> SmallVec<[Move; 64]> {
    let color_idx = pos.side_to_move as usize;
    let mut moves: SmallVec<[Move; 64]> = pos.all_legal_moves().into();

    moves.sort_by_cached_key(|&mv| {
        if Some(mv) == hash_move {
            return i32::MIN;
        }

        let from = mv._from();
        let to = mv._to();
        let moving_piece = pos.position[from];
        let captured = captured_piece(pos, mv);

        if let Some(captured) = captured {
            let victim_value = piece_value(captured);
            let attacker_value = piece_value(moving_piece.piece_type);
            return -(victim_value * 10 - attacker_value) - 1_000_000;
        }

        if mv.move_type().is_promotion() {
            return -8000;
        }

        if killers.is_killer(ply, mv) {
            return -5000;
        }

        -history.score(color_idx, mv)
    });

    moves
}

/// The piece type captured by `mv`, accounting for en passant where the
/// captured pawn isn't on the destination square.
fn captured_piece(pos: &Position, mv: Move) -> Option<Type> {
    if mv.move_type() == MoveType::EnPassant {
        return Some(Type::Pawn);
    }
    let piece = pos.position[mv._to()];
    if piece.piece_type == Type::None {
        None
    } else {
        Some(piece.piece_type)
    }
}

/// Sign-only static-exchange approximation: a capture is "obviously losing"
/// only when the captured piece is worth strictly less than the capturing
/// piece, with no attempt to walk the full exchange sequence.
pub fn see_sign_is_losing(pos: &Position, mv: Move) -> bool {
    let Some(victim) = captured_piece(pos, mv) else {
        return false;
    };
    let attacker = pos.position[mv._from()].piece_type;
    piece_value(victim) < piece_value(attacker)
}
