use maniac_shared::{GameId, RoundOutcome};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    context::GameContext,
    effects::EffectEvent,
    error::GameError,
    payout::{crash_payout, Settlement},
    rng::RandomSource,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrashConfig {
    pub countdown_ms: u64,
    pub pause_ms: u64,
    pub tick_ms: u64,
    pub growth_base: f64,
    pub growth_rate: f64,
    pub alpha: f64,
    pub min_point: f64,
    pub max_point: f64,
    pub history_len: usize,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            countdown_ms: 7_000,
            pause_ms: 2_500,
            tick_ms: 50,
            growth_base: 1.05,
            growth_rate: 2.0,
            alpha: 1.6,
            min_point: 1.0,
            max_point: 100.0,
            history_len: 10,
        }
    }
}

impl CrashConfig {
    pub fn countdown(&self) -> Duration {
        Duration::from_millis(self.countdown_ms)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    /// `growth_base ^ (growth_rate * t)` with `t` in seconds.
    pub fn multiplier_at(&self, elapsed: Duration) -> f64 {
        self.growth_base
            .powf(self.growth_rate * elapsed.as_secs_f64())
    }

    /// Running time needed for the curve to reach `multiplier`.
    pub fn time_to_reach(&self, multiplier: f64) -> Duration {
        if !(multiplier > 1.0) {
            return Duration::ZERO;
        }
        let secs = multiplier.ln() / (self.growth_rate * self.growth_base.ln());
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Inverse-transform draw from the power law `P(X > x) = x^-alpha`,
    /// clamped to `[min_point, max_point]`.
    pub fn sample_crash_point<R: RandomSource + ?Sized>(&self, rng: &mut R) -> f64 {
        let u = rng.next_f64();
        self.crash_point_for(u)
    }

    pub fn crash_point_for(&self, u: f64) -> f64 {
        let tail = 1.0 - u;
        if !(tail > 0.0) {
            return self.max_point;
        }
        (1.0 / tail)
            .powf(1.0 / self.alpha)
            .clamp(self.min_point, self.max_point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrashPhase {
    Betting,
    Running,
    Crashed,
}

impl CrashPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            CrashPhase::Betting => "betting",
            CrashPhase::Running => "running",
            CrashPhase::Crashed => "crashed",
        }
    }
}

impl fmt::Display for CrashPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrashRound {
    pub id: u64,
    pub phase: CrashPhase,
    pub crash_point: f64,
    pub stake: Option<u64>,
    pub cashed_out: bool,
    pub multiplier: f64,
    /// When the current phase began.
    pub phase_started: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CrashEvent {
    BettingOpened { round_id: u64, closes_in: Duration },
    BetPlaced { round_id: u64, stake: u64 },
    Launched { round_id: u64 },
    Multiplier { round_id: u64, multiplier: f64 },
    CashedOut { round_id: u64, settlement: Settlement },
    Crashed { round_id: u64, crash_point: f64, lost_stake: Option<u64> },
}

impl CrashEvent {
    pub fn round_id(&self) -> u64 {
        match self {
            CrashEvent::BettingOpened { round_id, .. }
            | CrashEvent::BetPlaced { round_id, .. }
            | CrashEvent::Launched { round_id }
            | CrashEvent::Multiplier { round_id, .. }
            | CrashEvent::CashedOut { round_id, .. }
            | CrashEvent::Crashed { round_id, .. } => *round_id,
        }
    }
}

pub struct CrashEngine {
    config: CrashConfig,
    round: CrashRound,
    history: VecDeque<f64>,
    rounds_played: u64,
    outbox: Vec<CrashEvent>,
}

impl CrashEngine {
    /// Opens betting on the first round.
    pub fn new(config: CrashConfig, ctx: &mut GameContext, now: Duration) -> Self {
        let crash_point = config.sample_crash_point(ctx.rng.as_mut());
        Self::with_crash_point(config, crash_point, now)
    }

    /// First round with a known crash point, for replays and tests.
    pub fn with_crash_point(config: CrashConfig, crash_point: f64, now: Duration) -> Self {
        let mut engine = Self {
            history: VecDeque::with_capacity(config.history_len),
            config,
            round: CrashRound {
                id: 0,
                phase: CrashPhase::Crashed,
                crash_point: 1.0,
                stake: None,
                cashed_out: false,
                multiplier: 1.0,
                phase_started: now,
            },
            rounds_played: 0,
            outbox: Vec::new(),
        };
        engine.open_betting(crash_point, now);
        engine
    }

    pub fn config(&self) -> &CrashConfig {
        &self.config
    }

    pub fn round(&self) -> &CrashRound {
        &self.round
    }

    pub fn phase(&self) -> CrashPhase {
        self.round.phase
    }

    /// Realized crash points, newest first.
    pub fn history(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    pub fn rounds_played(&self) -> u64 {
        self.rounds_played
    }

    pub fn countdown_remaining(&self, now: Duration) -> Duration {
        match self.round.phase {
            CrashPhase::Betting => self
                .config
                .countdown()
                .saturating_sub(now.saturating_sub(self.round.phase_started)),
            _ => Duration::ZERO,
        }
    }

    /// Abandons whatever round is in progress and opens betting on a new
    /// one. A stake riding on a running round is lost; one placed on a round
    /// that never launched goes back to the balance.
    pub fn restart(&mut self, ctx: &mut GameContext, now: Duration) {
        match self.round.phase {
            CrashPhase::Running => {
                self.settle_loss(ctx);
            }
            CrashPhase::Betting => {
                if let Some(stake) = self.round.stake.take() {
                    ctx.ledger.add_balance(stake);
                }
            }
            CrashPhase::Crashed => {}
        }
        let crash_point = self.config.sample_crash_point(ctx.rng.as_mut());
        self.open_betting(crash_point, now);
    }

    fn open_betting(&mut self, crash_point: f64, now: Duration) {
        let crash_point = if crash_point.is_nan() {
            warn!(crash_point, "non-numeric crash point, using the minimum");
            self.config.min_point
        } else {
            crash_point.clamp(self.config.min_point, self.config.max_point)
        };
        let id = self.round.id + 1;
        self.round = CrashRound {
            id,
            phase: CrashPhase::Betting,
            crash_point,
            stake: None,
            cashed_out: false,
            multiplier: 1.0,
            phase_started: now,
        };
        debug!(round_id = id, "crash betting opened");
        self.outbox.push(CrashEvent::BettingOpened {
            round_id: id,
            closes_in: self.config.countdown(),
        });
    }

    /// Brings the state machine up to `now`. Transitions are backdated to
    /// when they were due, so late ticks never drift the curve.
    fn advance(&mut self, ctx: &mut GameContext, now: Duration) {
        loop {
            let in_phase = now.saturating_sub(self.round.phase_started);
            match self.round.phase {
                CrashPhase::Betting => {
                    if in_phase < self.config.countdown() {
                        return;
                    }
                    self.round.phase = CrashPhase::Running;
                    self.round.phase_started += self.config.countdown();
                    self.round.multiplier = 1.0;
                    debug!(round_id = self.round.id, "crash round running");
                    self.outbox.push(CrashEvent::Launched {
                        round_id: self.round.id,
                    });
                }
                CrashPhase::Running => {
                    let m = self.config.multiplier_at(in_phase);
                    if m < self.round.crash_point {
                        self.round.multiplier = m;
                        return;
                    }
                    let to_crash = self.config.time_to_reach(self.round.crash_point);
                    let crashed_at = self.round.phase_started.saturating_add(to_crash);
                    self.crash(ctx, crashed_at.min(now));
                }
                CrashPhase::Crashed => {
                    if in_phase < self.config.pause() {
                        return;
                    }
                    let next_start = self.round.phase_started + self.config.pause();
                    let crash_point = self.config.sample_crash_point(ctx.rng.as_mut());
                    self.open_betting(crash_point, next_start);
                }
            }
        }
    }

    fn crash(&mut self, ctx: &mut GameContext, at: Duration) {
        let point = self.round.crash_point;
        self.round.phase = CrashPhase::Crashed;
        self.round.multiplier = point;
        self.round.phase_started = at;
        let lost_stake = self.settle_loss(ctx);
        ctx.notify(EffectEvent::Crash);

        self.history.push_front(point);
        self.history.truncate(self.config.history_len);
        self.rounds_played += 1;
        info!(round_id = self.round.id, crash_point = point, "crash round crashed");
        self.outbox.push(CrashEvent::Crashed {
            round_id: self.round.id,
            crash_point: point,
            lost_stake,
        });
    }

    /// A stake still riding when the round ends is a loss; it was debited
    /// when placed so only the stats move.
    fn settle_loss(&mut self, ctx: &mut GameContext) -> Option<u64> {
        let stake = self.round.stake.filter(|_| !self.round.cashed_out)?;
        self.round.cashed_out = true;
        ctx.ledger.settle(
            GameId::Crash,
            stake,
            0,
            self.round.crash_point,
            RoundOutcome::Loss,
        );
        ctx.notify(EffectEvent::Lose);
        Some(stake)
    }

    /// Moves the clock forward and returns everything that happened.
    pub fn tick(&mut self, ctx: &mut GameContext, now: Duration) -> Vec<CrashEvent> {
        self.advance(ctx, now);
        if self.round.phase == CrashPhase::Running {
            self.outbox.push(CrashEvent::Multiplier {
                round_id: self.round.id,
                multiplier: self.round.multiplier,
            });
        }
        self.drain_events()
    }

    pub fn drain_events(&mut self) -> Vec<CrashEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// One stake per round, during betting only. `Ok(None)` when this round
    /// already holds a stake.
    pub fn place_bet(
        &mut self,
        ctx: &mut GameContext,
        amount: u64,
        now: Duration,
    ) -> Result<Option<u64>, GameError> {
        self.advance(ctx, now);
        if self.round.phase != CrashPhase::Betting {
            return Err(GameError::BettingClosed {
                phase: self.round.phase,
            });
        }
        if self.round.stake.is_some() {
            debug!(round_id = self.round.id, "stake already placed, ignoring");
            return Ok(None);
        }
        let stake = ctx.place_stake(GameId::Crash, amount)?;
        self.round.stake = Some(stake);
        self.outbox.push(CrashEvent::BetPlaced {
            round_id: self.round.id,
            stake,
        });
        Ok(Some(stake))
    }

    /// Cashes the stake out at the current multiplier. `None` unless the
    /// round is running with an uncashed stake.
    pub fn cash_out(&mut self, ctx: &mut GameContext, now: Duration) -> Option<Settlement> {
        self.advance(ctx, now);
        if self.round.phase != CrashPhase::Running || self.round.cashed_out {
            return None;
        }
        let stake = self.round.stake?;
        let multiplier = self.round.multiplier;
        self.round.cashed_out = true;
        let payout = ctx.house.apply(GameId::Crash, crash_payout(stake, multiplier));
        let settlement =
            ctx.ledger
                .settle(GameId::Crash, stake, payout, multiplier, RoundOutcome::Win);
        ctx.notify(EffectEvent::Win);
        self.outbox.push(CrashEvent::CashedOut {
            round_id: self.round.id,
            settlement,
        });
        Some(settlement)
    }
}
