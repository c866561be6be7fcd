//! Deck construction for the memory game.

use crate::types::Card;
use rand::seq::SliceRandom;
use rand::Rng;

/// Fixed glyph pool. A difficulty uses the first N symbols; the pool is
/// exactly large enough for the hardest difficulty (18 pairs).
pub const SYMBOL_POOL: [char; 18] = [
    '🎮', '🎨', '🎭', '🎪', '🎯', '🎲', '🎸', '🎹', '🎺', '🎻', '🎬', '🎤', '🏀', '⚽', '🎾',
    '🏐', '🎳', '🏆',
];

/// Build a face-down deck of `pairs` duplicated symbols, uniformly shuffled
/// (Fisher-Yates).
pub fn build<R: Rng + ?Sized>(pairs: usize, rng: &mut R) -> Vec<Card> {
    debug_assert!(pairs <= SYMBOL_POOL.len());
    let symbols = &SYMBOL_POOL[..pairs];
    let mut deck: Vec<Card> = symbols
        .iter()
        .chain(symbols.iter())
        .map(|&symbol| Card::new(symbol))
        .collect();
    deck.shuffle(rng);
    deck
}
