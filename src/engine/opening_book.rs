//! Opening book: a FEN-keyed map to weighted candidate moves, loaded once
//! from an embedded JSON file. Keyed by normalized FEN rather than a
//! move-sequence tree, since the orchestrator probes by position, not by
//! game history. Pure data — there is no training loop here, only lookup.

use once_cell::sync::Lazy;
use rand::prelude::SliceRandom;
use serde::Deserialize;
use std::collections::HashMap;

use crate::game_repr::{Move, Position};

const BOOK_STR: &str = include_str!("book.json");

/// Below this weight an entry is never offered, even as the sole candidate.
const MIN_WEIGHT: f64 = 0.01;

#[derive(Deserialize)]
struct BookEntry {
    #[serde(rename = "move")]
    mv: String,
    weight: f64,
    #[serde(default)]
    #[allow(dead_code)]
    opening: Option<String>,
}

static BOOK: Lazy<HashMap<String, Vec<BookEntry>>> =
    Lazy::new(|| serde_json::from_str(BOOK_STR).expect("embedded opening book failed to parse"));

/// Strips move counters from a FEN so book lookups are insensitive to
/// halfmove clock / fullmove number.
pub fn normalize_fen(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

fn find_move_by_uci(position: &Position, uci: &str) -> Option<Move> {
    position.all_legal_moves().into_iter().find(|mv| mv.to_uci() == uci)
}

/// Looks up `position` in the book, picking a reply by weighted random
/// among entries at or above `MIN_WEIGHT`. Returns `None` on a miss, a
/// below-threshold-only entry set, or a book move that fails to resolve
/// against the actual legal-move list (a corrupt/out-of-sync book entry).
pub fn get(position: &Position) -> Option<Move> {
    let key = normalize_fen(&position.to_fen());
    let entries = BOOK.get(&key)?;

    let candidates: Vec<&BookEntry> = entries.iter().filter(|e| e.weight >= MIN_WEIGHT).collect();
    if candidates.is_empty() {
        return None;
    }

    let chosen = candidates.choose_weighted(&mut rand::thread_rng(), |e| e.weight).ok()?;
    find_move_by_uci(position, &chosen.mv)
}
