use maniac_shared::GameId;

use super::{GameRules, GameScreen, Round};
use crate::context::GameContext;
use crate::error::GameError;
use crate::payout::SlotMachine;
use crate::rng::RandomSource;
use crate::symbols::{draw_reels, Reels};

#[derive(Debug, Clone, Default)]
pub struct SlotRules {
    pub machine: SlotMachine,
}

impl GameRules for SlotRules {
    type Call = ();
    type Draw = Reels;

    const GAME: GameId = GameId::Slots;

    fn draw(&self, rng: &mut dyn RandomSource) -> Reels {
        draw_reels(rng, &self.machine.weights)
    }

    fn theoretical(&self, bet: u64, _call: (), reels: &Reels) -> f64 {
        self.machine.paytable.calculate_winnings(reels, bet)
    }
}

pub type Slots = GameScreen<SlotRules>;

impl Slots {
    pub fn new(machine: SlotMachine) -> Self {
        Self::with_rules(SlotRules { machine })
    }

    pub fn spin(
        &mut self,
        ctx: &mut GameContext,
        bet: u64,
    ) -> Result<Option<Round<(), Reels>>, GameError> {
        self.play(ctx, bet, ())
    }

    /// Name of the paytable rule the reels hit, if any.
    pub fn rule_for(&self, reels: &Reels) -> Option<&'static str> {
        self.rules().machine.paytable.evaluate(reels).map(|r| r.name)
    }
}
