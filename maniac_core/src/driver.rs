use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::{
    context::GameContext,
    crash::{CrashConfig, CrashEngine, CrashEvent, CrashRound},
    error::GameError,
    payout::Settlement,
};

struct CrashTable {
    engine: CrashEngine,
    ctx: GameContext,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrashSnapshot {
    pub round: CrashRound,
    pub history: Vec<f64>,
    pub balance: u64,
    pub countdown_remaining: Duration,
}

pub struct CrashDriver {
    table: Arc<Mutex<CrashTable>>,
    events: broadcast::Sender<CrashEvent>,
    epoch: Arc<AtomicU64>,
    origin: Instant,
    tick: Duration,
    task: Option<JoinHandle<()>>,
}

impl CrashDriver {
    /// Opens the first round and starts ticking. Must run inside a tokio
    /// runtime.
    pub fn start(mut ctx: GameContext, config: CrashConfig) -> Self {
        let origin = Instant::now();
        let tick = Duration::from_millis(config.tick_ms.max(1));
        let engine = CrashEngine::new(config, &mut ctx, Duration::ZERO);
        Self::spawn(CrashTable { engine, ctx }, origin, tick)
    }

    /// Drives an engine built elsewhere, whose clock started at `origin`.
    pub fn with_engine(engine: CrashEngine, ctx: GameContext, origin: Instant) -> Self {
        let tick = Duration::from_millis(engine.config().tick_ms.max(1));
        Self::spawn(CrashTable { engine, ctx }, origin, tick)
    }

    fn spawn(table: CrashTable, origin: Instant, tick: Duration) -> Self {
        let (events, _) = broadcast::channel(1024);
        let mut driver = Self {
            table: Arc::new(Mutex::new(table)),
            events,
            epoch: Arc::new(AtomicU64::new(0)),
            origin,
            tick,
            task: None,
        };
        driver.task = Some(driver.spawn_ticker(0));
        driver
    }

    fn spawn_ticker(&self, my_epoch: u64) -> JoinHandle<()> {
        let table = self.table.clone();
        let events = self.events.clone();
        let epoch = self.epoch.clone();
        let origin = self.origin;
        let period = self.tick;
        tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let batch = {
                    let mut guard = table.lock().await;
                    // a restart moved the epoch on while this tick waited
                    if epoch.load(Ordering::Acquire) != my_epoch {
                        debug!(my_epoch, "stale crash ticker exiting");
                        return;
                    }
                    let CrashTable { engine, ctx } = &mut *guard;
                    engine.tick(ctx, origin.elapsed())
                };
                for event in batch {
                    let _ = events.send(event);
                }
            }
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrashEvent> {
        self.events.subscribe()
    }

    /// Elapsed time on the table clock.
    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn publish(&self, batch: Vec<CrashEvent>) {
        for event in batch {
            let _ = self.events.send(event);
        }
    }

    pub async fn place_bet(&self, amount: u64) -> Result<Option<u64>, GameError> {
        let (result, batch) = {
            let mut guard = self.table.lock().await;
            let CrashTable { engine, ctx } = &mut *guard;
            let result = engine.place_bet(ctx, amount, self.now());
            (result, engine.drain_events())
        };
        self.publish(batch);
        result
    }

    pub async fn cash_out(&self) -> Option<Settlement> {
        let (settlement, batch) = {
            let mut guard = self.table.lock().await;
            let CrashTable { engine, ctx } = &mut *guard;
            let settlement = engine.cash_out(ctx, self.now());
            (settlement, engine.drain_events())
        };
        self.publish(batch);
        settlement
    }

    pub async fn snapshot(&self) -> CrashSnapshot {
        let guard = self.table.lock().await;
        CrashSnapshot {
            round: guard.engine.round().clone(),
            history: guard.engine.history().collect(),
            balance: guard.ctx.ledger.balance(),
            countdown_remaining: guard.engine.countdown_remaining(self.now()),
        }
    }

    /// Cancels the running tick task, opens a fresh round, and ticks it.
    pub async fn restart(&mut self) {
        let batch = {
            let mut guard = self.table.lock().await;
            let next = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
            if let Some(task) = self.task.take() {
                task.abort();
            }
            let CrashTable { engine, ctx } = &mut *guard;
            engine.restart(ctx, self.origin.elapsed());
            self.task = Some(self.spawn_ticker(next));
            engine.drain_events()
        };
        self.publish(batch);
    }

    /// Stops ticking. The table stays readable through [`Self::snapshot`].
    pub fn shutdown(&mut self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for CrashDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crash::CrashPhase;
    use crate::games::testing::context;

    #[tokio::test(start_paused = true)]
    async fn ticks_through_a_round_and_cashes_out() {
        let (ctx, _) = context(1_000, vec![0.3]);
        let config = CrashConfig::default();
        let engine = CrashEngine::with_crash_point(config.clone(), 3.5, Duration::ZERO);
        let driver = CrashDriver::with_engine(engine, ctx, Instant::now());
        let mut rx = driver.subscribe();

        assert_eq!(driver.place_bet(20).await, Ok(Some(20)));
        let past_two = config.countdown() + config.time_to_reach(2.0) + Duration::from_millis(60);
        time::sleep(past_two).await;

        let settlement = driver.cash_out().await.expect("running with a stake");
        assert!(settlement.multiplier >= 2.0 && settlement.multiplier < 2.05);
        assert_eq!(settlement.payout, 38);

        time::sleep(Duration::from_secs(7)).await;
        let snap = driver.snapshot().await;
        assert_eq!(snap.round.phase, CrashPhase::Crashed);
        assert_eq!(snap.history, vec![3.5]);
        assert_eq!(snap.balance, 1_018);

        let mut saw_crash = false;
        while let Ok(event) = rx.try_recv() {
            if let CrashEvent::Crashed { lost_stake, .. } = event {
                assert_eq!(lost_stake, None);
                saw_crash = true;
            }
        }
        assert!(saw_crash);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_ticker() {
        let (ctx, _) = context(1_000, vec![0.3]);
        let mut driver = CrashDriver::start(ctx, CrashConfig::default());
        let first = driver.snapshot().await.round.id;

        time::sleep(Duration::from_millis(500)).await;
        driver.restart().await;
        let snap = driver.snapshot().await;
        assert_eq!(snap.round.id, first + 1);
        assert_eq!(snap.round.phase, CrashPhase::Betting);
        assert!(driver.is_running());

        // the new round keeps its own countdown
        time::sleep(Duration::from_millis(6_000)).await;
        assert_eq!(driver.snapshot().await.round.phase, CrashPhase::Betting);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_freezes_the_table() {
        let (ctx, _) = context(1_000, vec![0.3]);
        let mut driver = CrashDriver::start(ctx, CrashConfig::default());
        driver.shutdown();
        time::sleep(Duration::from_secs(60)).await;
        let snap = driver.snapshot().await;
        assert_eq!(snap.round.phase, CrashPhase::Betting);
        assert_eq!(snap.history, Vec::<f64>::new());
        assert!(!driver.is_running());
    }
}
