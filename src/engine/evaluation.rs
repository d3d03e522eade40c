//! Static evaluation in centipawns, from the side-to-move's perspective
//! (positive = side to move is better). Combines material, piece-square
//! tables, pawn structure, king safety, mobility, the bishop pair, and
//! rook placement, tapered between midgame and endgame weights by game
//! phase.

use crate::game_repr::{Color, Piece, Position, Type};

use super::pawn_hash::{PawnEval, PawnHashTable};
use super::piece_square_tables::{pst_eg, pst_mg};
use super::zobrist;

pub const MATE_SCORE: i32 = 30_000;

const PAWN_VALUE: i32 = 100;
const KNIGHT_VALUE: i32 = 320;
const BISHOP_VALUE: i32 = 330;
const ROOK_VALUE: i32 = 500;
const QUEEN_VALUE: i32 = 900;

fn material_value(t: Type) -> i32 {
    match t {
        Type::Pawn => PAWN_VALUE,
        Type::Knight => KNIGHT_VALUE,
        Type::Bishop => BISHOP_VALUE,
        Type::Rook => ROOK_VALUE,
        Type::Queen => QUEEN_VALUE,
        Type::King | Type::None => 0,
    }
}

const TOTAL_PHASE: i32 = 24;

fn phase_weight(t: Type) -> i32 {
    match t {
        Type::Knight | Type::Bishop => 1,
        Type::Rook => 2,
        Type::Queen => 4,
        _ => 0,
    }
}

/// A score computed once in midgame and endgame form, mixed by game phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaperedScore {
    pub mg: i32,
    pub eg: i32,
}

impl TaperedScore {
    fn mix(self, phase: f32) -> i32 {
        (self.mg as f32 * phase + self.eg as f32 * (1.0 - phase)) as i32
    }
}

impl std::ops::Add for TaperedScore {
    type Output = TaperedScore;
    fn add(self, rhs: TaperedScore) -> TaperedScore {
        TaperedScore { mg: self.mg + rhs.mg, eg: self.eg + rhs.eg }
    }
}

impl std::ops::AddAssign for TaperedScore {
    fn add_assign(&mut self, rhs: TaperedScore) {
        self.mg += rhs.mg;
        self.eg += rhs.eg;
    }
}

/// Phase scalar in [0, 1]; 1.0 is a full-material opening position, 0.0 is
/// a bare-king endgame.
fn game_phase(position: &Position) -> f32 {
    let total: i32 = position
        .position
        .iter()
        .map(|p| phase_weight(p.piece_type))
        .sum();
    (total.min(TOTAL_PHASE) as f32) / (TOTAL_PHASE as f32)
}

fn is_passed_pawn(position: &Position, square: usize, color: Color) -> bool {
    let file = (square % 8) as i32;
    let rank = (square / 8) as i32;
    let dir = if color == Color::White { 1 } else { -1 };
    let enemy = color.opposite();

    for f in (file - 1).max(0)..=(file + 1).min(7) {
        let mut r = rank + dir;
        while (0..8).contains(&r) {
            let sq = (r * 8 + f) as usize;
            let p = position.position[sq];
            if p.piece_type == Type::Pawn && p.color == enemy {
                return false;
            }
            r += dir;
        }
    }
    true
}

fn pawn_structure_score(position: &Position, color: Color) -> TaperedScore {
    let mut file_counts = [0u32; 8];
    let mut pawn_squares: Vec<usize> = Vec::new();
    for (sq, p) in position.position.iter().enumerate() {
        if p.piece_type == Type::Pawn && p.color == color {
            file_counts[sq % 8] += 1;
            pawn_squares.push(sq);
        }
    }

    let mut score = TaperedScore::default();
    for &sq in &pawn_squares {
        let file = sq % 8;
        let rank = sq / 8;

        // Doubled
        if file_counts[file] > 1 {
            score += TaperedScore { mg: -10, eg: -20 };
        }

        // Isolated: no friendly pawn on adjacent files
        let left_has = file > 0 && file_counts[file - 1] > 0;
        let right_has = file < 7 && file_counts[file + 1] > 0;
        if !left_has && !right_has {
            score += TaperedScore { mg: -15, eg: -25 };
        }

        // Passed pawn, graded by how advanced it is
        if is_passed_pawn(position, sq, color) {
            let advance = if color == Color::White { rank } else { 7 - rank };
            let bonus = (advance as i32) * (advance as i32) * 4;
            score += TaperedScore { mg: bonus, eg: bonus * 2 };
        }

        // Pawn chain: a friendly pawn defending this one diagonally behind
        let behind_rank = if color == Color::White { rank.checked_sub(1) } else { rank.checked_add(1) };
        if let Some(br) = behind_rank {
            if (0..8).contains(&br) {
                let defended = [file.checked_sub(1), file.checked_add(1)]
                    .into_iter()
                    .flatten()
                    .filter(|&f| f < 8)
                    .any(|f| {
                        let s = br * 8 + f;
                        let p = position.position[s];
                        p.piece_type == Type::Pawn && p.color == color
                    });
                if defended {
                    score += TaperedScore { mg: 5, eg: 8 };
                }
            }
        }
    }
    score
}

fn king_safety_score(position: &Position, color: Color) -> TaperedScore {
    let Some(king_sq) = position.king_square(color) else {
        return TaperedScore::default();
    };
    let file = (king_sq % 8) as i32;
    let rank = (king_sq / 8) as i32;
    let dir = if color == Color::White { 1 } else { -1 };

    let mut shield = 0;
    for f in (file - 1).max(0)..=(file + 1).min(7) {
        let r = rank + dir;
        if (0..8).contains(&r) {
            let sq = (r * 8 + f) as usize;
            let p = position.position[sq];
            if p.piece_type == Type::Pawn && p.color == color {
                shield += 1;
            }
        }
    }

    let mut open_file_penalty = 0;
    let has_own_pawn_on_file = (0..8).any(|r| {
        let sq = (r * 8 + file) as usize;
        let p = position.position[sq];
        p.piece_type == Type::Pawn && p.color == color
    });
    if !has_own_pawn_on_file {
        open_file_penalty = 15;
    }

    let mut attackers = 0;
    for dx in -1i32..=1 {
        for dy in -1i32..=1 {
            let (x, y) = (file + dx, rank + dy);
            if (0..8).contains(&x) && (0..8).contains(&y) {
                let sq = (y * 8 + x) as usize;
                if position.is_square_attacked(sq, color.opposite()) {
                    attackers += 1;
                }
            }
        }
    }

    let mg = shield * 8 - open_file_penalty - attackers * 6;
    TaperedScore { mg, eg: mg / 4 }
}

fn mobility_score(position: &Position, color: Color) -> TaperedScore {
    let mut count = 0i32;
    for (sq, p) in position.position.iter().enumerate() {
        if p.color != color || p.piece_type == Type::None {
            continue;
        }
        count += match p.piece_type {
            Type::Knight => position.knight_moves(sq).len() as i32,
            Type::Bishop => position.bishop_moves(sq).len() as i32,
            Type::Rook => position.rook_moves(sq).len() as i32,
            Type::Queen => position.queen_moves(sq).len() as i32,
            _ => 0,
        };
    }
    TaperedScore { mg: count * 2, eg: count * 3 }
}

fn bishop_pair_score(position: &Position, color: Color) -> TaperedScore {
    let bishops = position
        .position
        .iter()
        .filter(|p| p.piece_type == Type::Bishop && p.color == color)
        .count();
    if bishops >= 2 {
        TaperedScore { mg: 30, eg: 50 }
    } else {
        TaperedScore::default()
    }
}

fn rook_placement_score(position: &Position, color: Color) -> TaperedScore {
    let mut score = TaperedScore::default();
    for (sq, p) in position.position.iter().enumerate() {
        if p.piece_type != Type::Rook || p.color != color {
            continue;
        }
        let file = sq % 8;
        let rank = sq / 8;

        let own_pawn_on_file = (0..8).any(|r| {
            let s = r * 8 + file;
            let q = position.position[s];
            q.piece_type == Type::Pawn && q.color == color
        });
        let enemy_pawn_on_file = (0..8).any(|r| {
            let s = r * 8 + file;
            let q = position.position[s];
            q.piece_type == Type::Pawn && q.color == color.opposite()
        });
        if !own_pawn_on_file && !enemy_pawn_on_file {
            score += TaperedScore { mg: 20, eg: 10 };
        } else if !own_pawn_on_file {
            score += TaperedScore { mg: 10, eg: 5 };
        }

        let seventh = if color == Color::White { 6 } else { 1 };
        if rank == seventh {
            score += TaperedScore { mg: 15, eg: 25 };
        }
    }
    score
}

fn material_and_pst(position: &Position, color: Color) -> TaperedScore {
    let mut score = TaperedScore::default();
    for (sq, p) in position.position.iter().enumerate() {
        if p.piece_type == Type::None || p.color != color {
            continue;
        }
        score.mg += material_value(p.piece_type) + pst_mg(p.piece_type, sq as u8, color == Color::White);
        score.eg += material_value(p.piece_type) + pst_eg(p.piece_type, sq as u8, color == Color::White);
    }
    score
}

fn side_score(position: &Position, color: Color, pawn_score: TaperedScore) -> TaperedScore {
    material_and_pst(position, color)
        + pawn_score
        + king_safety_score(position, color)
        + mobility_score(position, color)
        + bishop_pair_score(position, color)
        + rook_placement_score(position, color)
}

/// Probes `pawn_hash` for both colors' pawn structure score, computing and
/// storing it on a miss. Keyed by a pawns-only hash, so a capture or
/// pawn push invalidates the entry but a piece shuffle elsewhere doesn't.
fn cached_pawn_structure(position: &Position, pawn_hash: &mut PawnHashTable) -> PawnEval {
    let key = zobrist::pawn_hash(position);
    if let Some(cached) = pawn_hash.probe(key) {
        return cached;
    }
    let eval = PawnEval {
        white: pawn_structure_score(position, Color::White),
        black: pawn_structure_score(position, Color::Black),
    };
    pawn_hash.store(key, eval);
    eval
}

/// Full static evaluation, from the side-to-move's perspective.
pub fn evaluate(position: &Position, pawn_hash: &mut PawnHashTable) -> i32 {
    let phase = game_phase(position);
    let pawn_eval = cached_pawn_structure(position, pawn_hash);
    let white = side_score(position, Color::White, pawn_eval.white).mix(phase);
    let black = side_score(position, Color::Black, pawn_eval.black).mix(phase);
    let score = white - black;
    match position.side_to_move {
        Color::White => score,
        Color::Black => -score,
    }
}

/// Material-and-PST-only evaluation, used by quiescence's stand-pat where
/// the full evaluator's mobility/king-safety scan would be wasted work at
/// a leaf that's about to be re-evaluated one ply down anyway.
pub fn quick_evaluate(position: &Position) -> i32 {
    let phase = game_phase(position);
    let white = material_and_pst(position, Color::White).mix(phase);
    let black = material_and_pst(position, Color::Black).mix(phase);
    let score = white - black;
    match position.side_to_move {
        Color::White => score,
        Color::Black => -score,
    }
}

fn mirror_vertically(position: &Position) -> Position {
    let mut mirrored = position.clone();
    for sq in 0..64 {
        let mirror_sq = sq ^ 56; // flip rank, keep file
        let mut piece: Piece = position.position[sq];
        if piece.piece_type != Type::None {
            piece.color = piece.color.opposite();
        }
        mirrored.position[mirror_sq] = piece;
    }
    mirrored.side_to_move = position.side_to_move.opposite();
    mirrored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_is_balanced() {
        let pos = Position::default();
        let mut pawn_hash = PawnHashTable::new();
        assert_eq!(evaluate(&pos, &mut pawn_hash), 0);
    }

    #[test]
    fn extra_queen_is_clearly_winning() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4KQ2 w - - 0 1").unwrap();
        let mut pawn_hash = PawnHashTable::new();
        assert!(evaluate(&pos, &mut pawn_hash) > QUEEN_VALUE);
    }

    #[test]
    fn mirror_symmetry_holds() {
        let pos = Position::from_fen(
            "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 0 1",
        ).unwrap();
        let mirrored = mirror_vertically(&pos);
        let mut pawn_hash = PawnHashTable::new();
        assert_eq!(evaluate(&pos, &mut pawn_hash), evaluate(&mirrored, &mut pawn_hash));
    }

    #[test]
    fn bishop_pair_bonus_applies_to_two_bishops_only() {
        let one_bishop = Position::from_fen("4k3/8/8/8/8/8/8/2B1K3 w - - 0 1").unwrap();
        let two_bishops = Position::from_fen("4k3/8/8/8/8/8/8/2B1KB2 w - - 0 1").unwrap();
        let mut pawn_hash = PawnHashTable::new();
        let gap = evaluate(&two_bishops, &mut pawn_hash) - evaluate(&one_bishop, &mut pawn_hash) - BISHOP_VALUE;
        assert!(gap > 0);
    }

    #[test]
    fn passed_pawn_scores_higher_when_more_advanced() {
        let early = Position::from_fen("4k3/8/8/8/3P4/8/8/4K3 w - - 0 1").unwrap();
        let advanced = Position::from_fen("4k3/3P4/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let mut pawn_hash = PawnHashTable::new();
        assert!(evaluate(&advanced, &mut pawn_hash) > evaluate(&early, &mut pawn_hash));
    }
}
