use serde::{Deserialize, Serialize};

use crate::rng::{weighted_choice, RandomSource};

pub const REEL_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    Cherry,
    Lemon,
    Grape,
    Bell,
    Star,
    Diamond,
}

pub type Reels = [Symbol; REEL_COUNT];

impl Symbol {
    pub const ALL: [Symbol; 6] = [
        Symbol::Cherry,
        Symbol::Lemon,
        Symbol::Grape,
        Symbol::Bell,
        Symbol::Star,
        Symbol::Diamond,
    ];

    pub fn glyph(self) -> &'static str {
        match self {
            Symbol::Cherry => "🍒",
            Symbol::Lemon => "🍋",
            Symbol::Grape => "🍇",
            Symbol::Bell => "🔔",
            Symbol::Star => "⭐",
            Symbol::Diamond => "💎",
        }
    }
}

/// Relative weight of each symbol on every reel, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReelWeights(pub Vec<(Symbol, u32)>);

impl ReelWeights {
    pub fn total(&self) -> u64 {
        self.0.iter().map(|(_, w)| *w as u64).sum()
    }

    pub fn weight_of(&self, symbol: Symbol) -> u32 {
        self.0
            .iter()
            .filter(|(s, _)| *s == symbol)
            .map(|(_, w)| *w)
            .sum()
    }
}

impl Default for ReelWeights {
    fn default() -> Self {
        Self(vec![
            (Symbol::Cherry, 40),
            (Symbol::Lemon, 30),
            (Symbol::Grape, 15),
            (Symbol::Bell, 10),
            (Symbol::Star, 4),
            (Symbol::Diamond, 1),
        ])
    }
}

/// Three independent weighted draws.
pub fn draw_reels<R: RandomSource + ?Sized>(rng: &mut R, weights: &ReelWeights) -> Reels {
    let mut reels = [Symbol::Cherry; REEL_COUNT];
    for slot in reels.iter_mut() {
        if let Some(symbol) = weighted_choice(rng, &weights.0) {
            *slot = *symbol;
        }
    }
    reels
}
