use maniac_shared::GameId;
use std::sync::Arc;
use tracing::debug;

use crate::{
    effects::{EffectEvent, Effects},
    error::GameError,
    house_edge::HouseEdgeTable,
    ledger::Ledger,
    rng::RandomSource,
};

/// Services a game screen works against. Handed to every game call
/// instead of living in globals.
pub struct GameContext {
    pub ledger: Ledger,
    pub rng: Box<dyn RandomSource>,
    pub house: Arc<HouseEdgeTable>,
    pub effects: Box<dyn Effects>,
}

impl GameContext {
    pub fn new(
        ledger: Ledger,
        rng: impl RandomSource + 'static,
        house: Arc<HouseEdgeTable>,
        effects: impl Effects + 'static,
    ) -> Self {
        Self {
            ledger,
            rng: Box::new(rng),
            house,
            effects: Box::new(effects),
        }
    }

    pub fn max_bet(&self, game: GameId) -> u64 {
        self.house.max_bet(game, self.ledger.balance())
    }

    /// Affordability first, then the per-game limit.
    pub fn validate_bet(&self, game: GameId, amount: u64) -> Result<(), GameError> {
        let balance = self.ledger.balance();
        if !self.ledger.can_afford(amount) {
            return Err(GameError::InsufficientFunds { amount, balance });
        }
        if !self.house.is_bet_valid(game, amount, balance) {
            return Err(GameError::AboveLimit {
                game,
                amount,
                max: self.house.max_bet(game, balance),
            });
        }
        Ok(())
    }

    /// Validates and debits a stake. Zero is bumped to the minimum bet of 1.
    pub fn place_stake(&mut self, game: GameId, amount: u64) -> Result<u64, GameError> {
        let amount = amount.max(1);
        self.validate_bet(game, amount)?;
        let balance = self.ledger.debit(amount)?;
        debug!(%game, stake = amount, balance, "stake placed");
        Ok(amount)
    }

    pub fn notify(&self, event: EffectEvent) {
        self.effects.notify(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::NoEffects;
    use crate::rng::SequenceRandom;
    use crate::store::MemoryStore;
    use maniac_shared::Profile;

    fn ctx(balance: u64) -> GameContext {
        GameContext::new(
            Ledger::open(MemoryStore::with_profile(Profile::new(balance)), 1_000),
            SequenceRandom::new(vec![0.5]),
            Arc::new(HouseEdgeTable::default()),
            NoEffects,
        )
    }

    #[test]
    fn insufficient_funds_checked_before_limit() {
        let mut c = ctx(5);
        assert_eq!(
            c.place_stake(GameId::Coin, 10),
            Err(GameError::InsufficientFunds { amount: 10, balance: 5 })
        );
        assert_eq!(c.ledger.balance(), 5);
    }

    #[test]
    fn over_limit_is_rejected_without_debit() {
        let mut c = ctx(1_000);
        assert_eq!(
            c.place_stake(GameId::Dice, 101),
            Err(GameError::AboveLimit { game: GameId::Dice, amount: 101, max: 100 })
        );
        assert_eq!(c.ledger.balance(), 1_000);
        assert_eq!(c.place_stake(GameId::Dice, 100), Ok(100));
        assert_eq!(c.ledger.balance(), 900);
    }

    #[test]
    fn zero_stake_becomes_one() {
        let mut c = ctx(1_000);
        assert_eq!(c.place_stake(GameId::Slots, 0), Ok(1));
        assert_eq!(c.ledger.balance(), 999);
    }
}
