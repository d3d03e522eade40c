//! A single background worker thread per AI instance, holding its own
//! transposition table, pawn hash table, killer moves, and history table
//! across requests so repeated searches on related positions benefit from
//! the warm cache. Ownership lives in a struct held by the orchestrator
//! rather than global state, so multiple `Orchestrator` instances never
//! share search state.

use std::sync::atomic::AtomicBool;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::SearchConfig;
use crate::engine::move_ordering::{HistoryTable, KillerMoves};
use crate::engine::pawn_hash::PawnHashTable;
use crate::engine::search::{search, SearchResult};
use crate::engine::transposition_table::TranspositionTable;
use crate::game_repr::Position;

/// Search correctness and performance depend on exceeding any reasonable
/// per-move time budget; a hung worker thread is treated as a bug, not a
/// condition to silently tolerate.
const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(10);

enum Job {
    Search { position: Position, config: SearchConfig, cancel: Arc<AtomicBool> },
    ClearCache,
    Shutdown,
}

/// Owns the background thread and its channels. Dropping this tears the
/// worker down (it sends `Shutdown` and joins).
pub struct Worker {
    job_tx: Sender<Job>,
    result_rx: Receiver<SearchResult>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn() -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (result_tx, result_rx) = mpsc::channel::<SearchResult>();

        let handle = thread::Builder::new()
            .name("chess-search-worker".into())
            .spawn(move || worker_loop(job_rx, result_tx))
            .expect("failed to spawn search worker thread");

        Self { job_tx, result_rx, handle: Some(handle) }
    }

    /// Submits a search job. The caller gets results back via `recv`/
    /// `try_recv` — this call itself never blocks on search completion.
    pub fn submit(&self, position: Position, config: SearchConfig, cancel: Arc<AtomicBool>) {
        let _ = self.job_tx.send(Job::Search { position, config, cancel });
    }

    /// Drops the worker's transposition table, pawn hash table, killer
    /// moves, and history table. Fire-and-forget: ordering against any
    /// in-flight search is not guaranteed.
    pub fn clear_cache(&self) {
        let _ = self.job_tx.send(Job::ClearCache);
    }

    /// Blocks until a result arrives or the watchdog timeout elapses.
    /// Returns `None` on timeout — callers should treat that as a worker
    /// fault, not a normal search abort (normal aborts return a
    /// `SearchResult` with `aborted: true`).
    pub fn recv(&self) -> Option<SearchResult> {
        match self.result_rx.recv_timeout(WATCHDOG_TIMEOUT) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<SearchResult> {
        self.result_rx.try_recv().ok()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        let _ = self.job_tx.send(Job::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(job_rx: Receiver<Job>, result_tx: Sender<SearchResult>) {
    let mut tt = TranspositionTable::new();
    let mut pawn_hash = PawnHashTable::new();
    let mut killers = KillerMoves::new();
    let mut history = HistoryTable::new();

    for job in job_rx {
        match job {
            Job::Shutdown => break,
            Job::ClearCache => {
                tt.clear();
                pawn_hash.clear();
                killers.clear();
                history.clear();
            }
            Job::Search { position, config, cancel } => {
                let result = search(&position, &config, &cancel, &mut tt, &mut pawn_hash, &mut killers, &mut history);
                if result_tx.send(result).is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submits_and_receives_a_result() {
        let worker = Worker::spawn();
        let cancel = Arc::new(AtomicBool::new(false));
        let config = SearchConfig { max_depth: 2, ..SearchConfig::default() };
        worker.submit(Position::default(), config, cancel);
        let result = worker.recv().expect("worker should respond within the watchdog timeout");
        assert!(result.best_move.is_some());
    }

    #[test]
    fn cancel_flag_aborts_an_in_flight_search() {
        let worker = Worker::spawn();
        let cancel = Arc::new(AtomicBool::new(true));
        let config = SearchConfig { max_depth: 20, time_limit_ms: None, ..SearchConfig::default() };
        worker.submit(Position::default(), config, cancel);
        let result = worker.recv().expect("worker should respond within the watchdog timeout");
        assert!(result.aborted);
    }
}
