//! Error types surfaced by the engine to its caller. Search recursion
//! itself is infallible; these are the faults that can reach the
//! orchestrator's public API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller queried a position with no legal moves. The caller decides
    /// the game outcome (checkmate vs. stalemate); the engine just refuses
    /// to search further.
    #[error("no legal moves available in the queried position")]
    NoLegalMoves,

    /// A move from an auxiliary source (book, configured opening, caller
    /// override) was not present in the oracle's legal move list. Recovered
    /// internally by falling through to search — surfaced only when that
    /// fallback path still failed to produce a move.
    #[error("move {0} is not legal in the current position")]
    IllegalMove(String),

    /// A FEN string failed to parse into a valid position (bad piece
    /// character, malformed rank, or a rank that doesn't cover all 8 files).
    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    /// The worker's absolute watchdog timeout elapsed without a response.
    #[error("search exceeded the {0}ms watchdog timeout")]
    SearchTimeout(u64),

    /// `stop()` was invoked; not a failure, just an early return with the
    /// best move found so far. Kept as an error variant so callers that
    /// pattern-match on `Result` can distinguish "cancelled" from "never
    /// started".
    #[error("search was cancelled before completion")]
    CancelledSearch,

    /// An internal consistency check failed (incremental vs. full Zobrist
    /// hash mismatch, TT bucket corruption). The engine clears its tables
    /// and fails the request rather than returning a move it can no longer
    /// trust.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
