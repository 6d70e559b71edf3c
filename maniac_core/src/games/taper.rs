use maniac_shared::{GameId, RoundOutcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{context::GameContext, effects::EffectEvent, payout::Settlement};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TaperConfig {
    pub max_energy: u32,
    pub regen_ms: u64,
    pub base_reward: f64,
    pub combo_window_ms: u64,
    pub combo_step: f64,
    pub max_combo: f64,
}

impl Default for TaperConfig {
    fn default() -> Self {
        Self {
            max_energy: 100,
            regen_ms: 1_000,
            base_reward: 1.0,
            combo_window_ms: 800,
            combo_step: 0.1,
            max_combo: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapResult {
    pub reward: f64,
    pub combo: f64,
    pub energy: u32,
}

pub struct Taper {
    config: TaperConfig,
    energy: u32,
    regen_from: Duration,
    combo: f64,
    last_tap: Option<Duration>,
    accrued: f64,
}

impl Taper {
    pub fn new(config: TaperConfig, now: Duration) -> Self {
        Self {
            energy: config.max_energy,
            regen_from: now,
            combo: 1.0,
            last_tap: None,
            accrued: 0.0,
            config,
        }
    }

    pub fn accrued(&self) -> f64 {
        self.accrued
    }

    pub fn combo(&self) -> f64 {
        self.combo
    }

    pub fn energy(&mut self, now: Duration) -> u32 {
        self.regenerate(now);
        self.energy
    }

    fn regenerate(&mut self, now: Duration) {
        if self.energy >= self.config.max_energy || self.config.regen_ms == 0 {
            self.regen_from = now;
            return;
        }
        let elapsed = now.saturating_sub(self.regen_from).as_millis() as u64;
        let units = elapsed / self.config.regen_ms;
        if units == 0 {
            return;
        }
        let missing = (self.config.max_energy - self.energy) as u64;
        self.energy += units.min(missing) as u32;
        self.regen_from += Duration::from_millis(units * self.config.regen_ms);
        if self.energy >= self.config.max_energy {
            self.regen_from = now;
        }
    }

    /// `None` when out of energy.
    pub fn tap(&mut self, ctx: &GameContext, now: Duration) -> Option<TapResult> {
        self.regenerate(now);
        if self.energy == 0 {
            return None;
        }
        let window = Duration::from_millis(self.config.combo_window_ms);
        self.combo = match self.last_tap {
            Some(prev) if now.saturating_sub(prev) <= window => {
                (self.combo + self.config.combo_step).min(self.config.max_combo)
            }
            _ => 1.0,
        };
        self.last_tap = Some(now);
        self.energy -= 1;
        let reward = self.config.base_reward * self.combo;
        self.accrued += reward;
        ctx.notify(EffectEvent::Tap);
        Some(TapResult {
            reward,
            combo: self.combo,
            energy: self.energy,
        })
    }

    /// Credits the accrual after the edge. Nothing happens until the
    /// accrual is worth at least one whole credit.
    pub fn collect(&mut self, ctx: &mut GameContext) -> Option<Settlement> {
        let payout = ctx.house.apply(GameId::Taper, self.accrued);
        if payout == 0 {
            return None;
        }
        self.accrued = 0.0;
        let settlement = ctx
            .ledger
            .settle(GameId::Taper, 0, payout, 1.0, RoundOutcome::Win);
        ctx.notify(EffectEvent::Win);
        Some(settlement)
    }

    pub fn teardown(&mut self, ctx: &mut GameContext) -> Option<Settlement> {
        self.collect(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::testing::context;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn streak_builds_combo_up_to_cap() {
        let (ctx, _) = context(0, vec![0.5]);
        let mut taper = Taper::new(TaperConfig::default(), ms(0));
        let combos: Vec<f64> = (0..15)
            .map(|i| taper.tap(&ctx, ms(i * 100)).unwrap().combo)
            .collect();
        assert_eq!(combos[0], 1.0);
        assert!((combos[5] - 1.5).abs() < 1e-9);
        assert_eq!(*combos.last().unwrap(), 2.0);

        // a pause resets it
        assert_eq!(taper.tap(&ctx, ms(10_000)).unwrap().combo, 1.0);
    }

    #[test]
    fn energy_runs_out_and_regenerates() {
        let (ctx, effects) = context(0, vec![0.5]);
        let config = TaperConfig {
            max_energy: 3,
            ..TaperConfig::default()
        };
        let mut taper = Taper::new(config, ms(0));
        for _ in 0..3 {
            assert!(taper.tap(&ctx, ms(0)).is_some());
        }
        assert!(taper.tap(&ctx, ms(10)).is_none());
        assert_eq!(taper.energy(ms(2_500)), 2);
        assert_eq!(taper.energy(ms(60_000)), 3);
        assert_eq!(effects.events().len(), 3);
    }

    #[test]
    fn collect_applies_edge_and_counts_a_win() {
        let (mut ctx, _) = context(0, vec![0.5]);
        let mut taper = Taper::new(TaperConfig::default(), ms(0));
        taper.tap(&ctx, ms(0));
        // 1 * 0.97 floors to nothing yet
        assert!(taper.collect(&mut ctx).is_none());
        for i in 1..10 {
            taper.tap(&ctx, ms(i * 5_000));
        }
        assert_eq!(taper.accrued(), 10.0);
        let settlement = taper.collect(&mut ctx).unwrap();
        assert_eq!(settlement.payout, 9);
        assert_eq!(ctx.ledger.balance(), 9);
        assert_eq!(ctx.ledger.stats().wins, 1);
        assert_eq!(taper.accrued(), 0.0);
    }
}
