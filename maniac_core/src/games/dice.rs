use maniac_shared::GameId;

use super::{GameRules, GameScreen};
use crate::payout::{dice_payout, roll_die, DiceCall};
use crate::rng::RandomSource;

#[derive(Debug, Clone, Copy, Default)]
pub struct DiceRules;

impl GameRules for DiceRules {
    type Call = DiceCall;
    type Draw = u8;

    const GAME: GameId = GameId::Dice;

    fn draw(&self, rng: &mut dyn RandomSource) -> u8 {
        roll_die(rng)
    }

    fn accepts(&self, call: DiceCall) -> bool {
        call.is_valid()
    }

    fn theoretical(&self, bet: u64, call: DiceCall, roll: &u8) -> f64 {
        dice_payout(bet, call, *roll)
    }
}

pub type Dice = GameScreen<DiceRules>;

impl Dice {
    pub fn new() -> Self {
        Self::default()
    }
}
