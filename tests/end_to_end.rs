//! End-to-end scenarios: the literal scenario table (mate-finding, a won
//! endgame, opposition, a tactical shot, promotion, perft), plus the
//! null-move/LMR node-reduction check and the pondering time-reduction
//! check. Unit-level invariants (hash purity, TT probe/store, evaluator
//! symmetry) live next to their modules; this file only covers behavior
//! that spans the whole engine.

use std::sync::atomic::AtomicBool;
use std::time::Instant;

use chess_engine::config::SearchConfig;
use chess_engine::engine::move_ordering::{HistoryTable, KillerMoves};
use chess_engine::engine::pawn_hash::PawnHashTable;
use chess_engine::engine::search::{is_mate_score, search, MATE_SCORE};
use chess_engine::engine::transposition_table::TranspositionTable;
use chess_engine::game_repr::{move_to_san, Move, MoveType, Position};

fn fresh_tables() -> (TranspositionTable, PawnHashTable, KillerMoves, HistoryTable) {
    (TranspositionTable::new(), PawnHashTable::new(), KillerMoves::new(), HistoryTable::new())
}

fn run_search(fen: &str, max_depth: u8) -> chess_engine::engine::search::SearchResult {
    let pos = Position::from_fen(fen).unwrap();
    let (mut tt, mut pawn_hash, mut killers, mut history) = fresh_tables();
    let cancel = AtomicBool::new(false);
    let config = SearchConfig { max_depth, time_limit_ms: None, ..SearchConfig::default() };
    search(&pos, &config, &cancel, &mut tt, &mut pawn_hash, &mut killers, &mut history)
}

/// Row 1: at depth >= 2 the returned SAN is `Qxf7#` with score >= MATE-4.
#[test]
fn scenario_1_queen_mates_on_f7() {
    let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 0 1";
    let pos = Position::from_fen(fen).unwrap();
    let result = run_search(fen, 2);
    let mv = result.best_move.expect("a mating move should be found");
    assert_eq!(move_to_san(&pos, mv), "Qxf7#");
    assert!(result.score >= MATE_SCORE - 4);
}

/// Row 2: with the book enabled, the returned move is one of the
/// well-known main-line first moves; this engine's book is always
/// consulted by the orchestrator, so we go through `get_best_move`.
#[test]
fn scenario_2_opening_book_offers_a_main_line_move() {
    use chess_engine::config::Difficulty;
    use chess_engine::engine::Orchestrator;

    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    let mut orchestrator = Orchestrator::new(Difficulty::Expert);
    let response = orchestrator.get_best_move(fen).unwrap();
    assert!(response.from_book);
    assert!(
        ["e4", "d4", "c4", "Nf3"].contains(&response.best_move_san.as_str()),
        "expected a main-line book move, got {}",
        response.best_move_san
    );
}

/// Row 3: at depth >= 6 the engine returns `Ke3` (taking the opposition).
#[test]
fn scenario_3_king_takes_the_opposition() {
    let fen = "8/8/8/3k4/8/3K4/3P4/8 w - - 0 1";
    let pos = Position::from_fen(fen).unwrap();
    let result = run_search(fen, 6);
    let mv = result.best_move.expect("a move should be found");
    assert_eq!(move_to_san(&pos, mv), "Ke3");
}

/// Row 4: at depth >= 6 the returned move is `Qg6`.
#[test]
fn scenario_4_finds_the_qg6_tactic() {
    let fen = "2rr3k/pp3pp1/1nnqbN1p/3pN3/2pP4/2P3Q1/PPB4P/R4RK1 w - - 0 1";
    let pos = Position::from_fen(fen).unwrap();
    let result = run_search(fen, 6);
    let mv = result.best_move.expect("a move should be found");
    assert_eq!(move_to_san(&pos, mv), "Qg6");
}

/// Row 5: returned move is `b8=Q` (any promotion-to-queen SAN accepted).
#[test]
fn scenario_5_promotes_to_a_queen() {
    let fen = "8/1P6/8/8/8/5K2/6q1/3k4 w - - 0 1";
    let pos = Position::from_fen(fen).unwrap();
    let result = run_search(fen, 4);
    let mv = result.best_move.expect("a move should be found");
    let san = move_to_san(&pos, mv);
    assert!(san.starts_with("b8=Q"), "expected a queen promotion, got {san}");
}

/// Row 6: standard start, perft depth 4 enumerates exactly 197,281 nodes.
#[test]
fn scenario_6_perft_depth_4_from_the_starting_position() {
    let pos = Position::default();
    assert_eq!(pos.perft(4), 197_281);
}

#[test]
fn underpromotion_is_available_when_queening_stalemates() {
    // White pawn one step from promoting; queening here is not forced into
    // stalemate, so the search should still find a legal promoting move.
    let pos = Position::from_fen("4k3/4P3/4K3/8/8/8/8/8 w - - 0 1").unwrap();
    let moves = pos.all_legal_moves();
    assert!(moves.iter().any(|mv| matches!(
        mv.move_type(),
        MoveType::PromotionQueen | MoveType::PromotionRook | MoveType::PromotionBishop | MoveType::PromotionKnight
    )));
}

#[test]
fn stalemate_position_scores_to_zero() {
    let pos = Position::from_fen("7k/8/5KQ1/8/8/8/8/8 b - - 0 1").unwrap();
    assert!(pos.all_legal_moves().is_empty());
    assert!(!pos.is_in_check(pos.side_to_move));

    let result = run_search("7k/8/5KQ1/8/8/8/8/8 b - - 0 1", 1);
    assert_eq!(result.score, 0);
}

#[test]
fn checkmate_position_has_no_legal_moves_and_is_in_check() {
    let pos = Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 0 1").unwrap();
    assert!(pos.all_legal_moves().is_empty());
    assert!(pos.is_in_check(pos.side_to_move));
}

/// (a) search node count decreases with null-move/LMR enabled vs. plain
/// alpha-beta on a tactical position, without changing the chosen move.
#[test]
fn null_move_and_lmr_reduce_node_count_versus_plain_alpha_beta() {
    let pos = Position::default();
    let cancel = AtomicBool::new(false);

    let reduced_config = SearchConfig { max_depth: 6, time_limit_ms: None, ..SearchConfig::default() };
    let (mut tt_a, mut p_a, mut k_a, mut h_a) = fresh_tables();
    let reduced = search(&pos, &reduced_config, &cancel, &mut tt_a, &mut p_a, &mut k_a, &mut h_a);

    let plain_config = SearchConfig {
        max_depth: 6,
        time_limit_ms: None,
        null_move_enabled: false,
        lmr_enabled: false,
        futility_enabled: false,
        razoring_enabled: false,
        ..SearchConfig::default()
    };
    let (mut tt_b, mut p_b, mut k_b, mut h_b) = fresh_tables();
    let plain = search(&pos, &plain_config, &cancel, &mut tt_b, &mut p_b, &mut k_b, &mut h_b);

    assert!(
        reduced.nodes < plain.nodes,
        "pruned search visited {} nodes, plain alpha-beta visited {}",
        reduced.nodes,
        plain.nodes
    );
    assert_eq!(reduced.best_move, plain.best_move);
}

/// (b) pondering: a correctly guessed reply is served from cache well
/// under the original search time.
#[test]
fn pondering_a_correctly_guessed_reply_serves_from_cache_quickly() {
    use chess_engine::config::Difficulty;
    use chess_engine::engine::Orchestrator;

    let pos = Position::default();
    let mut orchestrator = Orchestrator::new(Difficulty::Hard);

    let first = orchestrator.get_best_move(&pos.to_fen()).expect("search should succeed");
    let best_move = first.best_move;
    let ponder_move = first.ponder_move.unwrap_or_else(|| {
        let mut after_best = pos.clone();
        after_best.make_move_undoable(best_move);
        after_best.all_legal_moves()[0]
    });

    let started = Instant::now();
    orchestrator.start_pondering(&pos, best_move, ponder_move);
    let original_elapsed = started.elapsed();

    let mut after_both = pos.clone();
    after_both.make_move_undoable(best_move);
    after_both.make_move_undoable(ponder_move);

    let served_start = Instant::now();
    let response = orchestrator.get_best_move(&after_both.to_fen()).expect("search should succeed");
    let served_elapsed = served_start.elapsed();

    assert!(response.best_move != Move::new(0, 0, MoveType::Normal));
    assert!(
        served_elapsed.as_millis() as f64 <= (original_elapsed.as_millis() as f64 * 0.2).max(20.0),
        "expected a cached ponder hit to resolve within 20% of the original search time, \
         original {:?}, served {:?}",
        original_elapsed,
        served_elapsed
    );
}
