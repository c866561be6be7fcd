//! Tile-matching memory game state machine.
//!
//! Lifecycle: `idle → running → won`. The deck is built and shuffled on
//! start/reset; the first flip starts the clock; every completed pair flip
//! counts a move immediately, then resolves after a short delay (shorter for
//! a match than for a mismatch, mirroring a player's visual-confirmation
//! pause). Matched cards stay face-up for the rest of the game; on the last
//! pair the game transitions to won, the clock freezes, and the best
//! completion time is persisted through the [`KeyValueStore`] seam when
//! strictly improved.
//!
//! All time-dependent behavior takes an injected `now`; the pending
//! resolution lives in a [`Delayed`] slot inside the state so that `reset`
//! cancels it and no stale mutation can land after a restart.

pub mod deck;

use crate::error::StoreError;
use crate::schedule::Delayed;
use crate::store::{load_best_time, save_best_time, KeyValueStore};
use crate::types::{format_elapsed, Card, Difficulty, GameStatus};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;

/// Delay before a matched pair is marked, in milliseconds.
pub const MATCH_REVEAL_MS: i64 = 500;

/// Delay before a mismatched pair flips back, in milliseconds.
pub const MISMATCH_REVEAL_MS: i64 = 1000;

/// What happened on a [`MemoryGame::flip`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOutcome {
    /// Structurally invalid flip: already face-up or matched, two cards
    /// pending, bad index, or game already won.
    Ignored,
    /// First card of a pair turned face-up.
    Flipped,
    /// Second card turned face-up; the move is counted and resolution is
    /// scheduled.
    PairFlipped,
}

/// Outcome of a pair resolution, emitted by [`MemoryGame::poll`] for
/// presentation subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Resolution {
    Matched {
        cards: (usize, usize),
        won: bool,
        new_best: bool,
    },
    Mismatched {
        cards: (usize, usize),
    },
}

#[derive(Debug, Clone, Copy)]
struct PendingResolution {
    first: usize,
    second: usize,
    matched: bool,
}

/// Memory game state machine.
pub struct MemoryGame {
    difficulty: Difficulty,
    deck: Vec<Card>,
    flipped: Vec<usize>,
    move_count: u32,
    matched_pairs: usize,
    status: GameStatus,
    started_at: Option<DateTime<Utc>>,
    final_seconds: Option<u64>,
    resolution: Delayed<PendingResolution>,
    store: Box<dyn KeyValueStore>,
    best_time: Option<u64>,
}

impl MemoryGame {
    /// Create a fresh idle game, loading any persisted best time.
    pub fn new<R: Rng + ?Sized>(
        difficulty: Difficulty,
        store: Box<dyn KeyValueStore>,
        rng: &mut R,
    ) -> Result<Self, StoreError> {
        let best_time = load_best_time(store.as_ref())?;
        Ok(Self {
            difficulty,
            deck: deck::build(difficulty.pair_count(), rng),
            flipped: Vec::with_capacity(2),
            move_count: 0,
            matched_pairs: 0,
            status: GameStatus::Idle,
            started_at: None,
            final_seconds: None,
            resolution: Delayed::new(),
            store,
            best_time,
        })
    }

    /// Return to a fresh idle deck at the current difficulty, cancelling any
    /// in-flight resolution and stopping the clock.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.resolution.cancel();
        self.deck = deck::build(self.difficulty.pair_count(), rng);
        self.flipped.clear();
        self.move_count = 0;
        self.matched_pairs = 0;
        self.status = GameStatus::Idle;
        self.started_at = None;
        self.final_seconds = None;
        tracing::debug!(difficulty = ?self.difficulty, "game reset");
    }

    /// Switch difficulty and reset.
    pub fn set_difficulty<R: Rng + ?Sized>(&mut self, difficulty: Difficulty, rng: &mut R) {
        self.difficulty = difficulty;
        self.reset(rng);
    }

    /// Turn a card face-up.
    ///
    /// Invalid flips are no-ops (see [`FlipOutcome::Ignored`]). The very
    /// first flip transitions idle → running and starts the clock. The second
    /// card of a pair counts the move immediately and schedules resolution:
    /// [`MATCH_REVEAL_MS`] for a match, [`MISMATCH_REVEAL_MS`] otherwise.
    pub fn flip(&mut self, index: usize, now: DateTime<Utc>) -> FlipOutcome {
        if self.status == GameStatus::Won || index >= self.deck.len() {
            return FlipOutcome::Ignored;
        }
        if self.flipped.len() >= 2 {
            return FlipOutcome::Ignored;
        }
        let card = self.deck[index];
        if card.face_up || card.matched {
            return FlipOutcome::Ignored;
        }

        if self.status == GameStatus::Idle {
            self.status = GameStatus::Running;
            self.started_at = Some(now);
            tracing::debug!(difficulty = ?self.difficulty, "first flip, clock started");
        }

        self.deck[index].face_up = true;
        self.flipped.push(index);

        if self.flipped.len() < 2 {
            return FlipOutcome::Flipped;
        }

        // The move counts at flip-pair time, before resolution fires.
        self.move_count += 1;
        let (first, second) = (self.flipped[0], self.flipped[1]);
        let matched = self.deck[first].symbol == self.deck[second].symbol;
        let delay_ms = if matched {
            MATCH_REVEAL_MS
        } else {
            MISMATCH_REVEAL_MS
        };
        self.resolution.arm(
            now,
            Duration::milliseconds(delay_ms),
            PendingResolution {
                first,
                second,
                matched,
            },
        );
        FlipOutcome::PairFlipped
    }

    /// Fire a due pair resolution, if any.
    ///
    /// A match marks both cards and, on the last pair, transitions to won:
    /// the clock freezes and the best time is written through the store when
    /// strictly lower than the stored one. A mismatch flips both cards back.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Result<Option<Resolution>, StoreError> {
        let Some(pending) = self.resolution.take_due(now) else {
            return Ok(None);
        };
        self.flipped.clear();

        if !pending.matched {
            self.deck[pending.first].face_up = false;
            self.deck[pending.second].face_up = false;
            return Ok(Some(Resolution::Mismatched {
                cards: (pending.first, pending.second),
            }));
        }

        self.deck[pending.first].matched = true;
        self.deck[pending.second].matched = true;
        self.matched_pairs += 1;

        let won = self.matched_pairs == self.total_pairs();
        let mut new_best = false;
        if won {
            self.status = GameStatus::Won;
            let elapsed = self.running_seconds(now);
            self.final_seconds = Some(elapsed);
            new_best = self.best_time.map_or(true, |best| elapsed < best);
            tracing::info!(
                elapsed,
                moves = self.move_count,
                new_best,
                "game won"
            );
            if new_best {
                save_best_time(self.store.as_mut(), elapsed)?;
                self.best_time = Some(elapsed);
            }
        }

        Ok(Some(Resolution::Matched {
            cards: (pending.first, pending.second),
            won,
            new_best,
        }))
    }

    /// Whole seconds on the game clock: zero while idle, live while running,
    /// frozen at the winning value afterwards.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        match self.status {
            GameStatus::Idle => 0,
            GameStatus::Running => self.running_seconds(now),
            GameStatus::Won => self.final_seconds.unwrap_or(0),
        }
    }

    /// Game clock formatted as mm:ss.
    pub fn formatted_elapsed(&self, now: DateTime<Utc>) -> String {
        format_elapsed(self.elapsed_seconds(now))
    }

    /// When the pending pair resolution is due, for hosts scheduling their
    /// next `poll`. None when nothing is pending.
    pub fn resolution_due_at(&self) -> Option<DateTime<Utc>> {
        self.resolution.due_at()
    }

    pub fn deck(&self) -> &[Card] {
        &self.deck
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn matched_pairs(&self) -> usize {
        self.matched_pairs
    }

    pub fn total_pairs(&self) -> usize {
        self.deck.len() / 2
    }

    /// Best completion time in seconds across all won games, if any.
    pub fn best_time(&self) -> Option<u64> {
        self.best_time
    }

    /// Hand the storage back, e.g. when tearing the game down.
    pub fn into_store(self) -> Box<dyn KeyValueStore> {
        self.store
    }

    fn running_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.started_at
            .map(|start| (now - start).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }
}
