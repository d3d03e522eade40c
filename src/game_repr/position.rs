use super::moves::{Move, MoveType};
use super::piece::{Color, Piece, Type};
use crate::error::EngineError;

/// Information needed to undo a move applied via [`Position::make_move_undoable`].
#[derive(Debug, Clone, Copy)]
pub struct UndoInfo {
    pub(crate) captured: Piece,
    /// Square the captured piece actually sat on. Differs from `mv._to()`
    /// only for en passant, where the captured pawn sits one rank behind
    /// the destination square.
    pub(crate) captured_square: usize,
    pub(crate) prev_castling: [bool; 6],
    pub(crate) prev_en_passant: Option<u8>,
    pub(crate) prev_halfmove_clock: u32,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct RepetitionKey {
    board: [Piece; 64],
    side: Color,
    castling: [bool; 6],
    en_passant: Option<u8>,
}

#[derive(Clone)]
pub struct Position {
    pub position: [Piece; 64],
    pub prev_moves: Vec<Move>,
    pub side_to_move: Color,
    /// 6 bits: [white K-rook, white Q-rook, white king, black K-rook, black Q-rook, black king]
    /// TRUE means that piece has not moved (and, for rooks, not been captured on its home square).
    pub castling_cond: [bool; 6],
    /// Target square of an en-passant capture available to the side to
    /// move, if any.
    pub en_passant: Option<u8>,
    pub halfmove_clock: u32,
    history: Vec<RepetitionKey>,
}

impl Default for Position {
    fn default() -> Self {
        Self::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .expect("starting position FEN is a fixed, known-valid literal")
    }
}

fn square_from_algebraic(s: &str) -> Option<u8> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = bytes[0].checked_sub(b'a')?;
    let rank = bytes[1].checked_sub(b'1')?;
    if file > 7 || rank > 7 {
        return None;
    }
    Some(rank * 8 + file)
}

fn algebraic_from_square(sq: usize) -> String {
    let file = (b'a' + (sq % 8) as u8) as char;
    let rank = (b'1' + (sq / 8) as u8) as char;
    format!("{file}{rank}")
}

impl Position {
    pub fn from_fen(fen_str: &str) -> Result<Position, EngineError> {
        let parts: Vec<&str> = fen_str.split_whitespace().collect();

        let piece_placement = parts.first().copied().unwrap_or("");
        let mut idx: isize = 56;
        let mut board = [Piece::default(); 64];

        for c in piece_placement.chars() {
            match c {
                '/' => {
                    idx -= 16;
                    if idx < 0 {
                        return Err(EngineError::InvalidFen(format!(
                            "rank separator overruns the board in '{fen_str}'"
                        )));
                    }
                }
                '1'..='8' => idx += c.to_digit(10).unwrap() as isize,
                _ => {
                    let piece = Piece::from_char(c).map_err(|bad| {
                        EngineError::InvalidFen(format!(
                            "unrecognized piece character '{bad}' in '{fen_str}'"
                        ))
                    })?;
                    if idx < 0 || idx as usize >= board.len() {
                        return Err(EngineError::InvalidFen(format!(
                            "rank overflows the board in '{fen_str}'"
                        )));
                    }
                    board[idx as usize] = piece;
                    idx += 1;
                }
            }
        }

        let side_to_move = if parts.get(1).copied() == Some("b") {
            Color::Black
        } else {
            Color::White
        };

        let mut castling_cond = [false; 6];
        match parts.get(2) {
            Some(&"-") | None => {}
            Some(castling_str) => {
                for c in castling_str.chars() {
                    match c {
                        'K' => {
                            castling_cond[0] = true;
                            castling_cond[2] = true;
                        }
                        'Q' => {
                            castling_cond[1] = true;
                            castling_cond[2] = true;
                        }
                        'k' => {
                            castling_cond[3] = true;
                            castling_cond[5] = true;
                        }
                        'q' => {
                            castling_cond[4] = true;
                            castling_cond[5] = true;
                        }
                        _ => {}
                    }
                }
            }
        }

        let en_passant = match parts.get(3) {
            Some(&"-") | None => None,
            Some(sq) => square_from_algebraic(sq),
        };

        let halfmove_clock = parts.get(4).and_then(|s| s.parse().ok()).unwrap_or(0);

        Ok(Self {
            position: board,
            prev_moves: Vec::new(),
            side_to_move,
            castling_cond,
            en_passant,
            halfmove_clock,
            history: Vec::new(),
        })
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();
        for rank in (0..8).rev() {
            let mut empty_count = 0;
            for file in 0..8 {
                let idx = rank * 8 + file;
                let piece = self.position[idx];
                if piece.piece_type == Type::None {
                    empty_count += 1;
                } else {
                    if empty_count > 0 {
                        fen.push_str(&empty_count.to_string());
                        empty_count = 0;
                    }
                    fen.push(piece.to_char());
                }
            }
            if empty_count > 0 {
                fen.push_str(&empty_count.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.side_to_move == Color::White { 'w' } else { 'b' });

        let mut castling = String::new();
        if self.castling_cond[2] {
            if self.castling_cond[0] {
                castling.push('K');
            }
            if self.castling_cond[1] {
                castling.push('Q');
            }
        }
        if self.castling_cond[5] {
            if self.castling_cond[3] {
                castling.push('k');
            }
            if self.castling_cond[4] {
                castling.push('q');
            }
        }
        if castling.is_empty() {
            castling.push('-');
        }
        fen.push(' ');
        fen.push_str(&castling);

        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&algebraic_from_square(sq as usize)),
            None => fen.push('-'),
        }

        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.prev_moves.len() / 2 + 1));
        fen
    }

    fn repetition_key(&self) -> RepetitionKey {
        RepetitionKey {
            board: self.position,
            side: self.side_to_move,
            castling: self.castling_cond,
            en_passant: self.en_passant,
        }
    }

    // ---------------------------------------------------------------
    // Attack detection (shared by check detection and castling legality)
    // ---------------------------------------------------------------

    pub fn is_square_attacked(&self, square: usize, by_color: Color) -> bool {
        let sq_x = (square % 8) as i32;
        let sq_y = (square / 8) as i32;

        let pawn_attack_offsets: [(i32, i32); 2] = match by_color {
            Color::White => [(-1, -1), (1, -1)],
            Color::Black => [(-1, 1), (1, 1)],
        };
        for (dx, dy) in pawn_attack_offsets {
            let (x, y) = (sq_x + dx, sq_y + dy);
            if (0..8).contains(&x) && (0..8).contains(&y) {
                let s = (y * 8 + x) as usize;
                let p = self.position[s];
                if p.piece_type == Type::Pawn && p.color == by_color {
                    return true;
                }
            }
        }

        const KNIGHT_OFFSETS: [(i32, i32); 8] = [
            (2, 1), (2, -1), (-2, 1), (-2, -1),
            (1, 2), (1, -2), (-1, 2), (-1, -2),
        ];
        for (dx, dy) in KNIGHT_OFFSETS {
            let (x, y) = (sq_x + dx, sq_y + dy);
            if (0..8).contains(&x) && (0..8).contains(&y) {
                let s = (y * 8 + x) as usize;
                let p = self.position[s];
                if p.piece_type == Type::Knight && p.color == by_color {
                    return true;
                }
            }
        }

        const KING_OFFSETS: [(i32, i32); 8] = [
            (1, 0), (-1, 0), (0, 1), (0, -1),
            (1, 1), (1, -1), (-1, 1), (-1, -1),
        ];
        for (dx, dy) in KING_OFFSETS {
            let (x, y) = (sq_x + dx, sq_y + dy);
            if (0..8).contains(&x) && (0..8).contains(&y) {
                let s = (y * 8 + x) as usize;
                let p = self.position[s];
                if p.piece_type == Type::King && p.color == by_color {
                    return true;
                }
            }
        }

        const DIAGONAL_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
        for (dx, dy) in DIAGONAL_DIRS {
            let (mut x, mut y) = (sq_x + dx, sq_y + dy);
            while (0..8).contains(&x) && (0..8).contains(&y) {
                let s = (y * 8 + x) as usize;
                let p = self.position[s];
                if p.piece_type != Type::None {
                    if p.color == by_color && matches!(p.piece_type, Type::Bishop | Type::Queen) {
                        return true;
                    }
                    break;
                }
                x += dx;
                y += dy;
            }
        }

        const ORTHOGONAL_DIRS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
        for (dx, dy) in ORTHOGONAL_DIRS {
            let (mut x, mut y) = (sq_x + dx, sq_y + dy);
            while (0..8).contains(&x) && (0..8).contains(&y) {
                let s = (y * 8 + x) as usize;
                let p = self.position[s];
                if p.piece_type != Type::None {
                    if p.color == by_color && matches!(p.piece_type, Type::Rook | Type::Queen) {
                        return true;
                    }
                    break;
                }
                x += dx;
                y += dy;
            }
        }

        false
    }

    pub fn king_square(&self, color: Color) -> Option<usize> {
        self.position
            .iter()
            .position(|p| p.piece_type == Type::King && p.color == color)
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        match self.king_square(color) {
            Some(sq) => self.is_square_attacked(sq, color.opposite()),
            None => false,
        }
    }

    // ---------------------------------------------------------------
    // Pseudo-legal move generation per piece type
    // ---------------------------------------------------------------

    fn sliding_moves(&self, idx: usize, dirs: &[(i32, i32)], out: &mut Vec<Move>) {
        let piece = self.position[idx];
        let (sx, sy) = ((idx % 8) as i32, (idx / 8) as i32);
        for &(dx, dy) in dirs {
            let (mut x, mut y) = (sx + dx, sy + dy);
            while (0..8).contains(&x) && (0..8).contains(&y) {
                let target = (y * 8 + x) as usize;
                let occ = self.position[target];
                if occ.piece_type == Type::None {
                    out.push(Move::new(idx as u8, target as u8, MoveType::Normal));
                } else {
                    if occ.color != piece.color {
                        out.push(Move::new(idx as u8, target as u8, MoveType::Normal));
                    }
                    break;
                }
                x += dx;
                y += dy;
            }
        }
    }

    const BISHOP_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
    const ROOK_DIRS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

    pub fn bishop_moves(&self, idx: usize) -> Vec<Move> {
        let mut out = Vec::with_capacity(13);
        self.sliding_moves(idx, &Self::BISHOP_DIRS, &mut out);
        out
    }

    pub fn rook_moves(&self, idx: usize) -> Vec<Move> {
        let mut out = Vec::with_capacity(14);
        self.sliding_moves(idx, &Self::ROOK_DIRS, &mut out);
        out
    }

    pub fn queen_moves(&self, idx: usize) -> Vec<Move> {
        let mut out = Vec::with_capacity(27);
        self.sliding_moves(idx, &Self::BISHOP_DIRS, &mut out);
        self.sliding_moves(idx, &Self::ROOK_DIRS, &mut out);
        out
    }

    pub fn knight_moves(&self, idx: usize) -> Vec<Move> {
        const OFFSETS: [(i32, i32); 8] = [
            (2, 1), (2, -1), (-2, 1), (-2, -1),
            (1, 2), (1, -2), (-1, 2), (-1, -2),
        ];
        let piece = self.position[idx];
        let (sx, sy) = ((idx % 8) as i32, (idx / 8) as i32);
        let mut out = Vec::with_capacity(8);
        for (dx, dy) in OFFSETS {
            let (x, y) = (sx + dx, sy + dy);
            if (0..8).contains(&x) && (0..8).contains(&y) {
                let target = (y * 8 + x) as usize;
                let occ = self.position[target];
                if occ.piece_type == Type::None || occ.color != piece.color {
                    out.push(Move::new(idx as u8, target as u8, MoveType::Normal));
                }
            }
        }
        out
    }

    pub fn king_moves(&self, idx: usize) -> Vec<Move> {
        const OFFSETS: [(i32, i32); 8] = [
            (1, 0), (-1, 0), (0, 1), (0, -1),
            (1, 1), (1, -1), (-1, 1), (-1, -1),
        ];
        let piece = self.position[idx];
        let (sx, sy) = ((idx % 8) as i32, (idx / 8) as i32);
        let mut out = Vec::with_capacity(10);
        for (dx, dy) in OFFSETS {
            let (x, y) = (sx + dx, sy + dy);
            if (0..8).contains(&x) && (0..8).contains(&y) {
                let target = (y * 8 + x) as usize;
                let occ = self.position[target];
                if occ.piece_type == Type::None || occ.color != piece.color {
                    out.push(Move::new(idx as u8, target as u8, MoveType::Normal));
                }
            }
        }

        // Castling
        let (rank_home, king_flag, k_rook_flag, q_rook_flag, k_rook_sq, q_rook_sq, k_dest, q_dest) =
            match piece.color {
                Color::White => (0usize, 2usize, 0usize, 1usize, 7usize, 0usize, 6usize, 2usize),
                Color::Black => (7usize, 5usize, 3usize, 4usize, 63usize, 56usize, 62usize, 58usize),
            };
        let king_home = rank_home * 8 + 4;
        if idx == king_home
            && self.castling_cond[king_flag]
            && !self.is_square_attacked(king_home, piece.color.opposite())
        {
            // Kingside
            if self.castling_cond[k_rook_flag]
                && self.position[king_home + 1].is_none()
                && self.position[king_home + 2].is_none()
                && self.position[k_rook_sq].piece_type == Type::Rook
                && !self.is_square_attacked(king_home + 1, piece.color.opposite())
                && !self.is_square_attacked(king_home + 2, piece.color.opposite())
            {
                out.push(Move::new(idx as u8, k_dest as u8, MoveType::Castling));
            }
            // Queenside
            if self.castling_cond[q_rook_flag]
                && self.position[king_home - 1].is_none()
                && self.position[king_home - 2].is_none()
                && self.position[king_home - 3].is_none()
                && self.position[q_rook_sq].piece_type == Type::Rook
                && !self.is_square_attacked(king_home - 1, piece.color.opposite())
                && !self.is_square_attacked(king_home - 2, piece.color.opposite())
            {
                out.push(Move::new(idx as u8, q_dest as u8, MoveType::Castling));
            }
        }

        out
    }

    fn push_pawn_move(out: &mut Vec<Move>, from: usize, to: usize, promo_rank: bool, move_type: MoveType) {
        if promo_rank && move_type != MoveType::EnPassant {
            out.push(Move::new(from as u8, to as u8, MoveType::PromotionQueen));
            out.push(Move::new(from as u8, to as u8, MoveType::PromotionRook));
            out.push(Move::new(from as u8, to as u8, MoveType::PromotionBishop));
            out.push(Move::new(from as u8, to as u8, MoveType::PromotionKnight));
        } else {
            out.push(Move::new(from as u8, to as u8, move_type));
        }
    }

    pub fn pawn_moves(&self, idx: usize) -> Vec<Move> {
        let piece = self.position[idx];
        let (sx, sy) = ((idx % 8) as i32, (idx / 8) as i32);
        let dir: i32 = if piece.color == Color::White { 1 } else { -1 };
        let start_rank = if piece.color == Color::White { 1 } else { 6 };
        let promo_rank_y = if piece.color == Color::White { 7 } else { 0 };
        let mut out = Vec::with_capacity(4);

        // Single / double push
        let one_y = sy + dir;
        if (0..8).contains(&one_y) {
            let one_sq = (one_y * 8 + sx) as usize;
            if self.position[one_sq].is_none() {
                Self::push_pawn_move(&mut out, idx, one_sq, one_y == promo_rank_y, MoveType::Normal);
                if sy == start_rank {
                    let two_y = sy + 2 * dir;
                    let two_sq = (two_y * 8 + sx) as usize;
                    if self.position[two_sq].is_none() {
                        out.push(Move::new(idx as u8, two_sq as u8, MoveType::Normal));
                    }
                }
            }
        }

        // Captures (incl. en passant)
        for dx in [-1i32, 1] {
            let (x, y) = (sx + dx, sy + dir);
            if !(0..8).contains(&x) || !(0..8).contains(&y) {
                continue;
            }
            let target = (y * 8 + x) as usize;
            let occ = self.position[target];
            if occ.piece_type != Type::None && occ.color != piece.color {
                Self::push_pawn_move(&mut out, idx, target, y == promo_rank_y, MoveType::Normal);
            } else if occ.is_none() && self.en_passant == Some(target as u8) {
                out.push(Move::new(idx as u8, target as u8, MoveType::EnPassant));
            }
        }

        out
    }

    fn pseudo_legal_moves(&self, idx: usize) -> Vec<Move> {
        match self.position[idx].piece_type {
            Type::Pawn => self.pawn_moves(idx),
            Type::Knight => self.knight_moves(idx),
            Type::Bishop => self.bishop_moves(idx),
            Type::Rook => self.rook_moves(idx),
            Type::Queen => self.queen_moves(idx),
            Type::King => self.king_moves(idx),
            Type::None => vec![],
        }
    }

    // ---------------------------------------------------------------
    // Make / unmake
    // ---------------------------------------------------------------

    /// Applies `mv` to the position, returning the information needed to
    /// undo it. Caller is responsible for having validated legality (or
    /// accepting pseudo-legal application followed by an `is_in_check`
    /// check, as `legal_moves` does internally).
    pub fn make_move_undoable(&mut self, mv: Move) -> UndoInfo {
        let from = mv._from();
        let to = mv._to();
        let moving_piece = self.position[from];
        let move_type = mv.move_type();

        let prev_castling = self.castling_cond;
        let prev_en_passant = self.en_passant;
        let prev_halfmove_clock = self.halfmove_clock;

        let (captured, captured_square) = match move_type {
            MoveType::EnPassant => {
                let cap_sq = match moving_piece.color {
                    Color::White => to - 8,
                    Color::Black => to + 8,
                };
                (self.position[cap_sq], cap_sq)
            }
            _ => (self.position[to], to),
        };

        let is_capture = !captured.is_none();
        let is_pawn_move = moving_piece.piece_type == Type::Pawn;
        self.halfmove_clock = if is_capture || is_pawn_move { 0 } else { self.halfmove_clock + 1 };

        // Castling rights updates
        if moving_piece.piece_type == Type::King {
            match moving_piece.color {
                Color::White => self.castling_cond[2] = false,
                Color::Black => self.castling_cond[5] = false,
            }
        }
        let mut clear_rook_right = |square: usize, cond: &mut [bool; 6]| match square {
            7 => cond[0] = false,
            0 => cond[1] = false,
            63 => cond[3] = false,
            56 => cond[4] = false,
            _ => {}
        };
        if moving_piece.piece_type == Type::Rook {
            clear_rook_right(from, &mut self.castling_cond);
        }
        if captured.piece_type == Type::Rook {
            clear_rook_right(captured_square, &mut self.castling_cond);
        }

        // Apply board changes
        if move_type == MoveType::EnPassant {
            self.position[captured_square] = Piece::default();
            self.position[to] = moving_piece;
            self.position[from] = Piece::default();
        } else if let Some(promoted) = move_type.promoted_type() {
            self.position[to] = Piece { piece_type: promoted, color: moving_piece.color };
            self.position[from] = Piece::default();
        } else if move_type == MoveType::Castling {
            self.position[to] = moving_piece;
            self.position[from] = Piece::default();
            let is_kingside = to > from;
            let (rook_from, rook_to) = match (moving_piece.color, is_kingside) {
                (Color::White, true) => (7, 5),
                (Color::White, false) => (0, 3),
                (Color::Black, true) => (63, 61),
                (Color::Black, false) => (56, 59),
            };
            self.position[rook_to] = self.position[rook_from];
            self.position[rook_from] = Piece::default();
        } else {
            self.position[to] = moving_piece;
            self.position[from] = Piece::default();
        }

        // New en-passant target: only set on a pawn double push
        self.en_passant = if is_pawn_move && (to as i64 - from as i64).abs() == 16 {
            Some(((from + to) / 2) as u8)
        } else {
            None
        };

        self.prev_moves.push(mv);
        self.side_to_move = self.side_to_move.opposite();
        self.history.push(self.repetition_key());

        UndoInfo {
            captured,
            captured_square,
            prev_castling,
            prev_en_passant,
            prev_halfmove_clock,
        }
    }

    pub fn unmake_move(&mut self, mv: Move, undo: UndoInfo) {
        self.history.pop();
        self.side_to_move = self.side_to_move.opposite();
        self.prev_moves.pop();

        let from = mv._from();
        let to = mv._to();
        let move_type = mv.move_type();
        let moved_color = self.side_to_move;

        match move_type {
            MoveType::Castling => {
                let is_kingside = to > from;
                let (rook_from, rook_to) = match (moved_color, is_kingside) {
                    (Color::White, true) => (7, 5),
                    (Color::White, false) => (0, 3),
                    (Color::Black, true) => (63, 61),
                    (Color::Black, false) => (56, 59),
                };
                self.position[rook_from] = self.position[rook_to];
                self.position[rook_to] = Piece::default();
                self.position[from] = self.position[to];
                self.position[to] = Piece::default();
            }
            MoveType::EnPassant => {
                self.position[from] = self.position[to];
                self.position[to] = Piece::default();
                self.position[undo.captured_square] = undo.captured;
            }
            _ if move_type.is_promotion() => {
                self.position[from] = Piece { piece_type: Type::Pawn, color: moved_color };
                self.position[to] = undo.captured;
            }
            _ => {
                self.position[from] = self.position[to];
                self.position[to] = undo.captured;
            }
        }

        self.castling_cond = undo.prev_castling;
        self.en_passant = undo.prev_en_passant;
        self.halfmove_clock = undo.prev_halfmove_clock;
    }

    /// Convenience wrapper for callers (perft, book priming) that don't
    /// need to undo.
    pub fn mk_move(&mut self, mv: Move) {
        self.make_move_undoable(mv);
    }

    /// Passes the turn without moving a piece, for null-move pruning. Not a
    /// legal chess move — callers must never leave this applied across a
    /// search boundary and must call it again to undo (it's its own
    /// inverse since it only flips `side_to_move`).
    pub fn toggle_side_for_null_move(&mut self) {
        self.side_to_move = self.side_to_move.opposite();
    }

    pub fn is_move_legal(&self, mv: Move) -> bool {
        let moving_color = self.position[mv._from()].color;
        let mut temp = self.clone();
        temp.mk_move(mv);
        !temp.is_in_check(moving_color)
    }

    pub fn legal_moves(&self, idx: usize) -> Vec<Move> {
        self.pseudo_legal_moves(idx)
            .into_iter()
            .filter(|&m| self.is_move_legal(m))
            .collect()
    }

    pub fn all_legal_moves(&self) -> Vec<Move> {
        let side = self.side_to_move;
        let mut moves = Vec::new();
        for idx in 0..64 {
            let piece = self.position[idx];
            if piece.piece_type != Type::None && piece.color == side {
                moves.extend(self.legal_moves(idx));
            }
        }
        moves
    }

    pub fn has_legal_moves(&self) -> bool {
        let side = self.side_to_move;
        (0..64).any(|idx| {
            let piece = self.position[idx];
            piece.piece_type != Type::None && piece.color == side && !self.legal_moves(idx).is_empty()
        })
    }

    pub fn is_checkmate(&self) -> bool {
        self.is_in_check(self.side_to_move) && !self.has_legal_moves()
    }

    pub fn is_stalemate(&self) -> bool {
        !self.is_in_check(self.side_to_move) && !self.has_legal_moves()
    }

    pub fn is_insufficient_material(&self) -> bool {
        let mut minor_count = [0u32; 2];
        let mut has_major_or_pawn = false;
        let mut bishop_square_colors: Vec<(Color, bool)> = Vec::new();

        for (idx, piece) in self.position.iter().enumerate() {
            match piece.piece_type {
                Type::None | Type::King => {}
                Type::Pawn | Type::Rook | Type::Queen => has_major_or_pawn = true,
                Type::Knight => minor_count[piece.color as usize] += 1,
                Type::Bishop => {
                    minor_count[piece.color as usize] += 1;
                    let light_square = (idx % 8 + idx / 8) % 2 == 0;
                    bishop_square_colors.push((piece.color, light_square));
                }
            }
        }

        if has_major_or_pawn {
            return false;
        }

        let total_minors: u32 = minor_count.iter().sum();
        if total_minors == 0 {
            return true; // K vs K
        }
        if total_minors == 1 {
            return true; // K+minor vs K
        }
        // K+B vs K+B on same-colored bishops
        if total_minors == 2
            && bishop_square_colors.len() == 2
            && bishop_square_colors[0].0 != bishop_square_colors[1].0
            && bishop_square_colors[0].1 == bishop_square_colors[1].1
        {
            return true;
        }
        false
    }

    pub fn is_threefold_repetition(&self) -> bool {
        if self.history.is_empty() {
            return false;
        }
        let current = self.repetition_key();
        self.history.iter().filter(|k| **k == current).count() >= 3
    }

    pub fn is_fifty_move_rule(&self) -> bool {
        self.halfmove_clock >= 100
    }

    pub fn is_draw(&self) -> bool {
        self.is_stalemate()
            || self.is_insufficient_material()
            || self.is_threefold_repetition()
            || self.is_fifty_move_rule()
    }

    /// Performance test: counts leaf nodes at a given depth. Used to
    /// validate move generation correctness against known perft values.
    pub fn perft(&self, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = self.all_legal_moves();
        if depth == 1 {
            return moves.len() as u64;
        }
        let mut nodes = 0;
        for mv in moves {
            let mut new_pos = self.clone();
            new_pos.mk_move(mv);
            nodes += new_pos.perft(depth - 1);
        }
        nodes
    }
}
