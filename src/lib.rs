//! Logic cores shared by the arcade demo pages.
//!
//! Provides:
//! - Arithmetic evaluator: calculator entry flow, operator chaining,
//!   scientific functions, rounded results, bounded history
//! - Tile-matching memory game: shuffled paired deck, flip state machine,
//!   move/time tracking, persisted best time
//! - Cancellable one-shot scheduling for delayed transitions
//! - Key-value storage seam for persisted values
//!
//! Both cores are single-threaded and event-driven: every time-dependent
//! operation takes an injected `now`, and delayed transitions fire through
//! explicit `poll` calls. Rendering is the host's concern.

pub mod error;
pub mod evaluator;
pub mod game;
pub mod schedule;
pub mod store;
pub mod types;

pub use error::{EvalError, Result, StoreError};
pub use evaluator::{round_result, Evaluator, ERROR_CLEAR_MS, HISTORY_LIMIT};
pub use game::{
    FlipOutcome, MemoryGame, Resolution, MATCH_REVEAL_MS, MISMATCH_REVEAL_MS,
};
pub use schedule::Delayed;
pub use store::{KeyValueStore, MemoryStore, BEST_TIME_KEY};
pub use types::{
    format_elapsed, Card, Constant, Difficulty, Function, GameStatus, HistoryEntry, Operator,
};
