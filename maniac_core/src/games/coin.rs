use maniac_shared::GameId;

use super::{GameRules, GameScreen};
use crate::payout::{coin_payout, flip_coin, CoinSide};
use crate::rng::RandomSource;

#[derive(Debug, Clone, Copy, Default)]
pub struct CoinRules;

impl GameRules for CoinRules {
    type Call = CoinSide;
    type Draw = CoinSide;

    const GAME: GameId = GameId::Coin;

    fn draw(&self, rng: &mut dyn RandomSource) -> CoinSide {
        flip_coin(rng)
    }

    fn theoretical(&self, bet: u64, call: CoinSide, landed: &CoinSide) -> f64 {
        coin_payout(bet, call, *landed)
    }
}

pub type CoinFlip = GameScreen<CoinRules>;

impl CoinFlip {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectEvent;
    use crate::error::GameError;
    use crate::games::testing::context;

    #[test]
    fn winning_call_pays_after_edge() {
        // 0.2 -> heads
        let (mut ctx, effects) = context(1_000, vec![0.2]);
        let mut coin = CoinFlip::new();
        let round = coin.play(&mut ctx, 100, CoinSide::Heads).unwrap().unwrap();
        assert_eq!(round.draw, CoinSide::Heads);
        // floor(100 * 1.95 * 0.98) = 191
        assert_eq!(round.settlement.payout, 191);
        assert_eq!(ctx.ledger.balance(), 1_091);
        assert_eq!(effects.events(), vec![EffectEvent::Win]);
    }

    #[test]
    fn losing_call_keeps_the_stake() {
        let (mut ctx, effects) = context(1_000, vec![0.7]);
        let mut coin = CoinFlip::new();
        let round = coin.play(&mut ctx, 50, CoinSide::Heads).unwrap().unwrap();
        assert_eq!(round.draw, CoinSide::Tails);
        assert!(!round.settlement.won());
        assert_eq!(ctx.ledger.balance(), 950);
        assert_eq!(ctx.ledger.stats().losses, 1);
        assert_eq!(effects.events(), vec![EffectEvent::Lose]);
    }

    #[test]
    fn insufficient_funds_rejects_before_debit() {
        let (mut ctx, _) = context(5, vec![0.2]);
        let mut coin = CoinFlip::new();
        assert_eq!(
            coin.play(&mut ctx, 10, CoinSide::Heads),
            Err(GameError::InsufficientFunds { amount: 10, balance: 5 })
        );
        assert_eq!(ctx.ledger.balance(), 5);
        assert!(!coin.in_flight());
    }

    #[test]
    fn second_flip_while_in_flight_is_ignored() {
        let (mut ctx, _) = context(1_000, vec![0.2]);
        let mut coin = CoinFlip::new();
        assert_eq!(coin.start(&mut ctx, 10, CoinSide::Heads), Ok(Some(CoinSide::Heads)));
        assert_eq!(coin.start(&mut ctx, 10, CoinSide::Tails), Ok(None));
        assert_eq!(ctx.ledger.balance(), 990);
        assert!(coin.settle(&mut ctx).is_some());
        assert!(coin.settle(&mut ctx).is_none());
    }

    #[test]
    fn teardown_settles_a_drawn_round() {
        let (mut ctx, _) = context(1_000, vec![0.2]);
        let mut coin = CoinFlip::new();
        coin.start(&mut ctx, 10, CoinSide::Heads).unwrap();
        let round = coin.teardown(&mut ctx).unwrap();
        assert_eq!(round.settlement.payout, 19);
        assert!(!coin.in_flight());
        assert_eq!(ctx.ledger.balance(), 1_009);
    }
}
