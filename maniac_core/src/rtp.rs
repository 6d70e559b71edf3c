use maniac_shared::GameId;
use serde::Serialize;

use crate::{
    crash::CrashConfig,
    house_edge::HouseEdgeTable,
    payout::{
        coin_payout, crash_payout, dice_payout, flip_coin, roll_die, CoinSide, DiceCall,
        SlotMachine,
    },
    rng::RandomSource,
    symbols::{Reels, Symbol},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimGame {
    Coin,
    DiceParity,
    DiceExact,
    Slots,
    /// Crash with an automatic cash-out at `target`.
    Crash { target: f64 },
}

impl SimGame {
    pub fn game(self) -> GameId {
        match self {
            SimGame::Coin => GameId::Coin,
            SimGame::DiceParity | SimGame::DiceExact => GameId::Dice,
            SimGame::Slots => GameId::Slots,
            SimGame::Crash { .. } => GameId::Crash,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct RtpReport {
    pub rounds: u64,
    pub hits: u64,
    pub wagered: u128,
    pub returned: u128,
}

impl RtpReport {
    pub fn rtp(&self) -> f64 {
        if self.wagered == 0 {
            0.0
        } else {
            self.returned as f64 / self.wagered as f64
        }
    }

    pub fn hit_rate(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.hits as f64 / self.rounds as f64
        }
    }

    pub fn house_edge(&self) -> f64 {
        1.0 - self.rtp()
    }
}

pub struct Simulation<'a> {
    pub house: &'a HouseEdgeTable,
    pub machine: &'a SlotMachine,
    pub crash: &'a CrashConfig,
}

impl Simulation<'_> {
    /// Plays `rounds` rounds of `bet` each; calls alternate heads/tails,
    /// even/odd and 1..=6 so no single call is favoured.
    pub fn run<R: RandomSource + ?Sized>(
        &self,
        game: SimGame,
        rounds: u64,
        bet: u64,
        rng: &mut R,
    ) -> RtpReport {
        let bet = bet.max(1);
        let mut report = RtpReport::default();
        for i in 0..rounds {
            let theoretical = match game {
                SimGame::Coin => {
                    let call = if i % 2 == 0 { CoinSide::Heads } else { CoinSide::Tails };
                    coin_payout(bet, call, flip_coin(rng))
                }
                SimGame::DiceParity => {
                    let call = if i % 2 == 0 { DiceCall::Even } else { DiceCall::Odd };
                    dice_payout(bet, call, roll_die(rng))
                }
                SimGame::DiceExact => {
                    let call = DiceCall::Exact((i % 6) as u8 + 1);
                    dice_payout(bet, call, roll_die(rng))
                }
                SimGame::Slots => self.machine.spin(rng, bet).theoretical,
                SimGame::Crash { target } => {
                    let point = self.crash.sample_crash_point(rng);
                    if target < point {
                        crash_payout(bet, target)
                    } else {
                        0.0
                    }
                }
            };
            let paid = self.house.apply(game.game(), theoretical);
            report.rounds += 1;
            report.wagered += bet as u128;
            report.returned += paid as u128;
            if theoretical > 0.0 {
                report.hits += 1;
            }
        }
        report
    }
}

/// Exact slots RTP over all reel outcomes, ignoring the per-round floor.
pub fn theoretical_slots_rtp(machine: &SlotMachine, edge: f64) -> f64 {
    let total = machine.weights.total() as f64;
    if total == 0.0 {
        return 0.0;
    }
    let p = |s: Symbol| machine.weights.weight_of(s) as f64 / total;
    let mut rtp = 0.0;
    for a in Symbol::ALL {
        for b in Symbol::ALL {
            for c in Symbol::ALL {
                let reels: Reels = [a, b, c];
                let multiplier = machine.paytable.evaluate(&reels).map_or(0.0, |r| r.multiplier);
                rtp += p(a) * p(b) * p(c) * multiplier;
            }
        }
    }
    rtp * (1.0 - edge)
}

/// Exact crash RTP for a fixed cash-out target, ignoring the floor.
pub fn theoretical_crash_rtp(crash: &CrashConfig, target: f64, edge: f64) -> f64 {
    if target < crash.min_point || target >= crash.max_point {
        return 0.0;
    }
    // P(point > target) = target^-alpha, the clamp only adds mass at the ends
    target * target.powf(-crash.alpha) * (1.0 - edge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ThreadRandom;

    fn defaults() -> (HouseEdgeTable, SlotMachine, CrashConfig) {
        (HouseEdgeTable::default(), SlotMachine::default(), CrashConfig::default())
    }

    fn sim<'a>(
        house: &'a HouseEdgeTable,
        machine: &'a SlotMachine,
        crash: &'a CrashConfig,
    ) -> Simulation<'a> {
        Simulation { house, machine, crash }
    }

    #[test]
    fn coin_rtp_near_expectation() {
        let (house, machine, crash) = defaults();
        let mut rng = ThreadRandom::seeded(9);
        let report = sim(&house, &machine, &crash).run(SimGame::Coin, 100_000, 1_000, &mut rng);
        // 0.5 * 1.95 * 0.98
        assert!((report.rtp() - 0.9555).abs() < 0.01, "rtp {}", report.rtp());
        assert!((report.hit_rate() - 0.5).abs() < 0.01);
    }

    #[test]
    fn dice_exact_rtp_near_expectation() {
        let (house, machine, crash) = defaults();
        let mut rng = ThreadRandom::seeded(10);
        let report =
            sim(&house, &machine, &crash).run(SimGame::DiceExact, 100_000, 1_000, &mut rng);
        // 5.5 / 6 * 0.98
        assert!((report.rtp() - 0.8983).abs() < 0.03, "rtp {}", report.rtp());
    }

    #[test]
    fn slots_simulation_tracks_exact_rtp() {
        let (house, machine, crash) = defaults();
        let exact = theoretical_slots_rtp(&machine, house.edge_for(GameId::Slots));
        // the standard table returns more than it takes; the any-pair rule dominates
        assert!((exact - 1.1779).abs() < 0.001, "exact {exact}");
        let mut rng = ThreadRandom::seeded(11);
        let report = sim(&house, &machine, &crash).run(SimGame::Slots, 200_000, 1_000, &mut rng);
        assert!((report.rtp() - exact).abs() < 0.03, "sim {} exact {exact}", report.rtp());
    }

    #[test]
    fn crash_simulation_tracks_exact_rtp() {
        let (house, machine, crash) = defaults();
        let exact = theoretical_crash_rtp(&crash, 2.0, house.edge_for(GameId::Crash));
        let mut rng = ThreadRandom::seeded(12);
        let game = SimGame::Crash { target: 2.0 };
        let report = sim(&house, &machine, &crash).run(game, 100_000, 1_000, &mut rng);
        assert!((report.rtp() - exact).abs() < 0.02, "sim {} exact {exact}", report.rtp());
    }

    #[test]
    fn empty_run_reports_zero() {
        let report = RtpReport::default();
        assert_eq!(report.rtp(), 0.0);
        assert_eq!(report.hit_rate(), 0.0);
    }
}
