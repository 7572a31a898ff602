//! Pluggable source of secret words.
//!
//! Word-list curation is out of scope for the core — the gateway just
//! needs *something* that hands out a random word per round. Servers
//! bring their own list by implementing [`WordSource`].

use rand::Rng;

/// Provides a random secret word for each round.
///
/// Picks are independent: repeats across consecutive rounds are allowed.
pub trait WordSource: Send + Sync + 'static {
    /// Returns one word, chosen uniformly at random.
    fn pick(&self) -> String;
}

/// A small built-in list of easily drawable words, good enough for
/// development and demos.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinWords;

const WORDS: &[&str] = &[
    "apple", "bicycle", "candle", "dragon", "elephant", "flower", "guitar",
    "hammer", "island", "jacket", "kite", "ladder", "mountain", "needle",
    "octopus", "penguin", "quilt", "rocket", "snowman", "tractor",
    "umbrella", "volcano", "windmill", "xylophone", "yacht", "zebra",
];

impl WordSource for BuiltinWords {
    fn pick(&self) -> String {
        let idx = rand::rng().random_range(0..WORDS.len());
        WORDS[idx].to_string()
    }
}
