//! Minimal CLI smoke test for the search engine: runs one search from a
//! FEN (or the starting position) and prints the chosen move. The TUI
//! frontend this engine serves is out of scope here; this binary exists so
//! the crate has something runnable.

use std::env;

use chess_engine::config::Difficulty;
use chess_engine::engine::Orchestrator;

fn main() {
    env_logger::init();

    let fen = env::args().nth(1);
    let fen = fen.as_deref().unwrap_or("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");

    let mut orchestrator = Orchestrator::new(Difficulty::Hard);
    match orchestrator.get_best_move(fen) {
        Ok(response) => {
            println!(
                "best move: {} (score {}, depth {}, nodes {}, from_book {})",
                response.best_move_san,
                response.score,
                response.depth,
                response.nodes,
                response.from_book
            );
        }
        Err(err) => {
            eprintln!("search failed: {err}");
            std::process::exit(1);
        }
    }
}
