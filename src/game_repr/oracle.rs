//! The capability set the search core consumes: a position loader,
//! legal-move enumerator, make/undo, terminal predicates, and board/history
//! accessors. The engine never reaches into `Position` directly outside
//! this module — everything above treats positions opaquely through this
//! trait, so a different legal-move generator (an external library, a
//! bitboard engine) could be swapped in without touching search/eval/TT
//! code.

use super::moves::Move;
use super::piece::{Color, Piece};
use super::position::{Position, UndoInfo};
use crate::error::{EngineError, Result};

pub trait MoveOracle {
    /// Replaces the current position with the one described by `fen`.
    /// Fails if the string doesn't parse into a valid position.
    fn load(&mut self, fen: &str) -> Result<()>;
    fn fen(&self) -> String;
    fn turn(&self) -> Color;
    /// All legal moves for the side to move.
    fn moves(&self) -> Vec<Move>;
    /// Applies `mv`, which must be present in `moves()`. Returns
    /// `EngineError::IllegalMove` otherwise, so callers pulling moves from
    /// an auxiliary source (book, caller override) can fall through to
    /// search instead of panicking.
    fn make(&mut self, mv: Move) -> Result<()>;
    /// Undoes the most recent `make`, if any.
    fn undo(&mut self) -> Option<Move>;
    fn in_check(&self) -> bool;
    fn is_checkmate(&self) -> bool;
    fn is_stalemate(&self) -> bool;
    fn is_draw(&self) -> bool;
    fn is_insufficient_material(&self) -> bool;
    fn is_threefold_repetition(&self) -> bool;
    fn board(&self) -> &[Piece; 64];
    fn history(&self) -> &[Move];
}

/// Native `MoveOracle` backed directly by this crate's mailbox `Position`.
pub struct NativeOracle {
    position: Position,
    undo_stack: Vec<UndoInfo>,
}

impl NativeOracle {
    pub fn new(position: Position) -> Self {
        Self { position, undo_stack: Vec::new() }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Applies an already-known-legal move without re-validating against
    /// `moves()`. Used by the search hot path, which only ever plays moves
    /// it just generated itself — re-checking legality there would make
    /// every node's move loop quadratic in branching factor.
    pub fn make_unchecked(&mut self, mv: Move) -> UndoInfo {
        self.position.make_move_undoable(mv)
    }

    pub fn unmake_unchecked(&mut self, mv: Move, undo: UndoInfo) {
        self.position.unmake_move(mv, undo);
    }
}

impl Default for NativeOracle {
    fn default() -> Self {
        Self::new(Position::default())
    }
}

impl MoveOracle for NativeOracle {
    fn load(&mut self, fen: &str) -> Result<()> {
        self.position = Position::from_fen(fen)?;
        self.undo_stack.clear();
        Ok(())
    }

    fn fen(&self) -> String {
        self.position.to_fen()
    }

    fn turn(&self) -> Color {
        self.position.side_to_move
    }

    fn moves(&self) -> Vec<Move> {
        self.position.all_legal_moves()
    }

    fn make(&mut self, mv: Move) -> Result<()> {
        if !self.moves().contains(&mv) {
            return Err(EngineError::IllegalMove(mv.to_uci()));
        }
        let undo = self.position.make_move_undoable(mv);
        self.undo_stack.push(undo);
        Ok(())
    }

    fn undo(&mut self) -> Option<Move> {
        let mv = *self.position.prev_moves.last()?;
        let undo = self.undo_stack.pop()?;
        self.position.unmake_move(mv, undo);
        Some(mv)
    }

    fn in_check(&self) -> bool {
        self.position.is_in_check(self.position.side_to_move)
    }

    fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    fn is_stalemate(&self) -> bool {
        self.position.is_stalemate()
    }

    fn is_draw(&self) -> bool {
        self.position.is_draw()
    }

    fn is_insufficient_material(&self) -> bool {
        self.position.is_insufficient_material()
    }

    fn is_threefold_repetition(&self) -> bool {
        self.position.is_threefold_repetition()
    }

    fn board(&self) -> &[Piece; 64] {
        &self.position.position
    }

    fn history(&self) -> &[Move] {
        &self.position.prev_moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_then_undo_restores_fen() {
        let mut oracle = NativeOracle::default();
        let start_fen = oracle.fen();
        let mv = oracle.moves()[0];
        oracle.make(mv).unwrap();
        assert_ne!(oracle.fen(), start_fen);
        oracle.undo();
        assert_eq!(oracle.fen(), start_fen);
    }

    #[test]
    fn illegal_move_is_rejected() {
        let mut oracle = NativeOracle::default();
        let bogus = Move::new(0, 63, super::super::moves::MoveType::Normal);
        assert!(oracle.make(bogus).is_err());
    }
}
