pub mod coin;
pub mod dice;
pub mod slots;
pub mod taper;

use maniac_shared::{GameId, RoundOutcome};
use tracing::debug;

use crate::{
    context::GameContext,
    effects::EffectEvent,
    error::GameError,
    payout::Settlement,
    rng::RandomSource,
};

pub use coin::{CoinFlip, CoinRules};
pub use dice::{Dice, DiceRules};
pub use slots::{SlotRules, Slots};
pub use taper::{TapResult, Taper, TaperConfig};

/// Win condition and payout of one discrete game.
pub trait GameRules {
    type Call: Copy;
    type Draw: Copy;

    const GAME: GameId;

    fn draw(&self, rng: &mut dyn RandomSource) -> Self::Draw;

    /// Checked before any stake moves.
    fn accepts(&self, _call: Self::Call) -> bool {
        true
    }

    /// Payout before the house edge; zero on a loss.
    fn theoretical(&self, bet: u64, call: Self::Call, draw: &Self::Draw) -> f64;
}

#[derive(Debug, Clone, Copy)]
struct Pending<C, D> {
    bet: u64,
    call: C,
    draw: D,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Round<C, D> {
    pub call: C,
    pub draw: D,
    pub settlement: Settlement,
}

pub struct GameScreen<R: GameRules> {
    rules: R,
    pending: Option<Pending<R::Call, R::Draw>>,
}

impl<R: GameRules> GameScreen<R> {
    pub fn with_rules(rules: R) -> Self {
        Self {
            rules,
            pending: None,
        }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Debits `bet` and draws the outcome. `Ok(None)` means a round is
    /// already in flight and nothing happened.
    pub fn start(
        &mut self,
        ctx: &mut GameContext,
        bet: u64,
        call: R::Call,
    ) -> Result<Option<R::Draw>, GameError> {
        if self.pending.is_some() {
            debug!(game = %R::GAME, "round already in flight, ignoring");
            return Ok(None);
        }
        if !self.rules.accepts(call) {
            return Err(GameError::InvalidCall { game: R::GAME });
        }
        let bet = ctx.place_stake(R::GAME, bet)?;
        let draw = self.rules.draw(ctx.rng.as_mut());
        self.pending = Some(Pending { bet, call, draw });
        Ok(Some(draw))
    }

    /// Credits the in-flight round, if any.
    pub fn settle(&mut self, ctx: &mut GameContext) -> Option<Round<R::Call, R::Draw>> {
        let Pending { bet, call, draw } = self.pending.take()?;
        let theoretical = self.rules.theoretical(bet, call, &draw);
        let payout = ctx.house.apply(R::GAME, theoretical);
        let (outcome, effect) = if theoretical > 0.0 {
            (RoundOutcome::Win, EffectEvent::Win)
        } else {
            (RoundOutcome::Loss, EffectEvent::Lose)
        };
        let multiplier = theoretical / bet as f64;
        let settlement = ctx.ledger.settle(R::GAME, bet, payout, multiplier, outcome);
        ctx.notify(effect);
        Some(Round {
            call,
            draw,
            settlement,
        })
    }

    pub fn play(
        &mut self,
        ctx: &mut GameContext,
        bet: u64,
        call: R::Call,
    ) -> Result<Option<Round<R::Call, R::Draw>>, GameError> {
        match self.start(ctx, bet, call)? {
            Some(_) => Ok(self.settle(ctx)),
            None => Ok(None),
        }
    }

    /// Leaving the screen mid-round still pays out the drawn outcome.
    pub fn teardown(&mut self, ctx: &mut GameContext) -> Option<Round<R::Call, R::Draw>> {
        self.settle(ctx)
    }
}

impl<R: GameRules + Default> Default for GameScreen<R> {
    fn default() -> Self {
        Self::with_rules(R::default())
    }
}
