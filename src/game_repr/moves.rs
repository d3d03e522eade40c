// Move representation using compact 16-bit encoding
//
// This allows efficient storage and comparison of moves while encoding
// all necessary information (source, destination, and move type).

/*-------ARCHITECTURE--------*/

// | 6 bits | 6 bits | 4 bits |
// |  From  |   To   | Type   |
// |        16 bits           |

use super::piece::Type;
use super::position::Position;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveType {
    Normal = 1,
    EnPassant = 2,
    PromotionQueen = 4,
    PromotionRook = 5,
    PromotionBishop = 6,
    PromotionKnight = 7,
    Castling = 8,
}

impl MoveType {
    pub fn is_promotion(&self) -> bool {
        matches!(
            self,
            MoveType::PromotionQueen
                | MoveType::PromotionRook
                | MoveType::PromotionBishop
                | MoveType::PromotionKnight
        )
    }

    pub fn promoted_type(&self) -> Option<Type> {
        match self {
            MoveType::PromotionQueen => Some(Type::Queen),
            MoveType::PromotionRook => Some(Type::Rook),
            MoveType::PromotionBishop => Some(Type::Bishop),
            MoveType::PromotionKnight => Some(Type::Knight),
            _ => None,
        }
    }
}

impl From<u16> for MoveType {
    fn from(value: u16) -> Self {
        match value {
            1 => MoveType::Normal,
            2 => MoveType::EnPassant,
            4 => MoveType::PromotionQueen,
            5 => MoveType::PromotionRook,
            6 => MoveType::PromotionBishop,
            7 => MoveType::PromotionKnight,
            8 => MoveType::Castling,
            _ => panic!("Invalid value for MoveType: {}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    buf: u16,
}

impl Move {
    pub fn new(from: u8, to: u8, move_type: MoveType) -> Move {
        let mut buf = 0u16;
        buf |= (from as u16) << 10;
        buf |= (to as u16) << 4;
        buf |= move_type as u16;

        Self { buf }
    }

    pub fn move_type(&self) -> MoveType {
        (self.buf & 0xF).into()
    }

    pub fn _from(&self) -> usize {
        ((self.buf >> 10) & 0x3F) as usize
    }

    pub fn _to(&self) -> usize {
        ((self.buf >> 4) & 0x3F) as usize
    }

    pub fn is_promotion(&self) -> bool {
        self.move_type().is_promotion()
    }

    /// UCI-style coordinate notation (`e2e4`, `a7a8q`). Used for the SAN
    /// layer and for logging; the engine itself only ever compares `Move`
    /// values, never strings.
    pub fn to_uci(&self) -> String {
        let sq = |idx: usize| -> String {
            let file = (b'a' + (idx % 8) as u8) as char;
            let rank = (b'1' + (idx / 8) as u8) as char;
            format!("{file}{rank}")
        };
        let mut s = format!("{}{}", sq(self._from()), sq(self._to()));
        if let Some(p) = self.move_type().promoted_type() {
            let c = match p {
                Type::Queen => 'q',
                Type::Rook => 'r',
                Type::Bishop => 'b',
                Type::Knight => 'n',
                _ => unreachable!(),
            };
            s.push(c);
        }
        s
    }
}

fn file_char(square: usize) -> char {
    (b'a' + (square % 8) as u8) as char
}

fn rank_char(square: usize) -> char {
    (b'1' + (square / 8) as u8) as char
}

fn algebraic(square: usize) -> String {
    format!("{}{}", file_char(square), rank_char(square))
}

fn piece_letter(t: Type) -> char {
    match t {
        Type::King => 'K',
        Type::Queen => 'Q',
        Type::Rook => 'R',
        Type::Bishop => 'B',
        Type::Knight => 'N',
        Type::Pawn | Type::None => unreachable!("pawns and empty squares have no SAN piece letter"),
    }
}

/// File/rank prefix needed to disambiguate `mv` from other legal moves of
/// the same piece type landing on the same square. Empty when `mv` is
/// already unambiguous.
fn disambiguation(pos: &Position, mv: Move) -> String {
    let moving = pos.position[mv._from()];
    let from = mv._from();

    let others: Vec<usize> = pos
        .all_legal_moves()
        .into_iter()
        .filter(|&other| {
            other != mv
                && other._to() == mv._to()
                && pos.position[other._from()].piece_type == moving.piece_type
                && pos.position[other._from()].color == moving.color
        })
        .map(|other| other._from())
        .collect();

    if others.is_empty() {
        return String::new();
    }

    let same_file = others.iter().any(|&o| o % 8 == from % 8);
    let same_rank = others.iter().any(|&o| o / 8 == from / 8);

    if !same_file {
        file_char(from).to_string()
    } else if !same_rank {
        rank_char(from).to_string()
    } else {
        algebraic(from)
    }
}

/// Standard Algebraic Notation for `mv`, played from `pos`. Handles
/// disambiguation, captures, castling, promotion, and the trailing `+`/`#`
/// suffix (determined by applying the move and testing the result).
pub fn move_to_san(pos: &Position, mv: Move) -> String {
    if mv.move_type() == MoveType::Castling {
        let mut san = if mv._to() > mv._from() { "O-O".to_string() } else { "O-O-O".to_string() };
        let mut after = pos.clone();
        after.mk_move(mv);
        if after.is_checkmate() {
            san.push('#');
        } else if after.is_in_check(after.side_to_move) {
            san.push('+');
        }
        return san;
    }

    let moving = pos.position[mv._from()];
    let is_capture =
        mv.move_type() == MoveType::EnPassant || pos.position[mv._to()].piece_type != Type::None;

    let mut san = String::new();
    match moving.piece_type {
        Type::Pawn => {
            if is_capture {
                san.push(file_char(mv._from()));
                san.push('x');
            }
            san.push_str(&algebraic(mv._to()));
            if let Some(promoted) = mv.move_type().promoted_type() {
                san.push('=');
                san.push(piece_letter(promoted));
            }
        }
        _ => {
            san.push(piece_letter(moving.piece_type));
            san.push_str(&disambiguation(pos, mv));
            if is_capture {
                san.push('x');
            }
            san.push_str(&algebraic(mv._to()));
        }
    }

    let mut after = pos.clone();
    after.mk_move(mv);
    if after.is_checkmate() {
        san.push('#');
    } else if after.is_in_check(after.side_to_move) {
        san.push('+');
    }

    san
}
