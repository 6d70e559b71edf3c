use maniac_shared::{GameId, RoundOutcome};
use serde::{Deserialize, Serialize};

use crate::{
    paytable::Paytable,
    rng::{uniform_int, RandomSource},
    symbols::{draw_reels, ReelWeights, Reels},
};

// These sit below fair odds on purpose; the table edge is applied on top.
pub const COIN_MULTIPLIER: f64 = 1.95;
pub const DICE_PARITY_MULTIPLIER: f64 = 1.9;
pub const DICE_EXACT_MULTIPLIER: f64 = 5.5;

/// `floor(theoretical * (1 - edge))`, zero for non-positive or NaN input.
/// Always rounds toward the house.
pub fn apply_payout(theoretical: f64, edge: f64) -> u64 {
    if !(theoretical > 0.0) {
        return 0;
    }
    let edge = edge.clamp(0.0, 1.0);
    (theoretical * (1.0 - edge)).floor() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

pub fn flip_coin<R: RandomSource + ?Sized>(rng: &mut R) -> CoinSide {
    if uniform_int(rng, 0, 1) == 0 {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    }
}

pub fn coin_payout(bet: u64, call: CoinSide, landed: CoinSide) -> f64 {
    if call == landed {
        bet as f64 * COIN_MULTIPLIER
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiceCall {
    Even,
    Odd,
    Exact(u8),
}

impl DiceCall {
    pub fn multiplier(self) -> f64 {
        match self {
            DiceCall::Even | DiceCall::Odd => DICE_PARITY_MULTIPLIER,
            DiceCall::Exact(_) => DICE_EXACT_MULTIPLIER,
        }
    }

    /// Exact calls name a face of the die.
    pub fn is_valid(self) -> bool {
        match self {
            DiceCall::Even | DiceCall::Odd => true,
            DiceCall::Exact(n) => (1..=6).contains(&n),
        }
    }

    pub fn wins(self, roll: u8) -> bool {
        match self {
            DiceCall::Even => roll % 2 == 0,
            DiceCall::Odd => roll % 2 == 1,
            DiceCall::Exact(n) => n == roll,
        }
    }
}

pub fn roll_die<R: RandomSource + ?Sized>(rng: &mut R) -> u8 {
    uniform_int(rng, 1, 6) as u8
}

pub fn dice_payout(bet: u64, call: DiceCall, roll: u8) -> f64 {
    if call.wins(roll) {
        bet as f64 * call.multiplier()
    } else {
        0.0
    }
}

pub fn crash_payout(stake: u64, multiplier: f64) -> f64 {
    stake as f64 * multiplier
}

#[derive(Debug, Clone)]
pub struct SlotMachine {
    pub weights: ReelWeights,
    pub paytable: Paytable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotSpin {
    pub reels: Reels,
    pub rule: Option<&'static str>,
    pub multiplier: f64,
    pub theoretical: f64,
}

impl SlotMachine {
    pub fn spin<R: RandomSource + ?Sized>(&self, rng: &mut R, bet: u64) -> SlotSpin {
        let reels = draw_reels(rng, &self.weights);
        self.score(reels, bet)
    }

    pub fn score(&self, reels: Reels, bet: u64) -> SlotSpin {
        let rule = self.paytable.evaluate(&reels);
        let multiplier = rule.map_or(0.0, |r| r.multiplier);
        SlotSpin {
            reels,
            rule: rule.map(|r| r.name),
            multiplier,
            theoretical: bet as f64 * multiplier,
        }
    }
}

impl Default for SlotMachine {
    fn default() -> Self {
        Self {
            weights: ReelWeights::default(),
            paytable: Paytable::standard(),
        }
    }
}

/// Result of a settled round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub game: GameId,
    pub stake: u64,
    pub payout: u64,
    /// Multiplier the round paid at before the edge; 0 on a loss.
    pub multiplier: f64,
    pub outcome: RoundOutcome,
    pub balance: u64,
}

impl Settlement {
    pub fn won(&self) -> bool {
        self.outcome == RoundOutcome::Win
    }
}
