use maniac_shared::{GameId, Profile, RoundOutcome, Settings, Stats, StatsDelta};
use tracing::{debug, warn};

use crate::{error::GameError, payout::Settlement, store::Store};

pub type Subscriber = Box<dyn FnMut(u64) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct Ledger {
    profile: Profile,
    store: Box<dyn Store>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl Ledger {
    /// Loads the stored profile, or starts a fresh one at `starting_balance`.
    /// An unreadable store is logged and treated as empty.
    pub fn open(store: impl Store + 'static, starting_balance: u64) -> Self {
        let loaded = match store.load() {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "failed to load profile, starting fresh");
                None
            }
        };
        let fresh = loaded.is_none();
        let mut ledger = Self {
            profile: loaded.unwrap_or_else(|| Profile::new(starting_balance)),
            store: Box::new(store),
            subscribers: Vec::new(),
            next_subscription: 0,
        };
        if fresh {
            ledger.persist();
        }
        ledger
    }

    pub fn balance(&self) -> u64 {
        self.profile.balance
    }

    pub fn stats(&self) -> Stats {
        self.profile.stats
    }

    pub fn settings(&self) -> &Settings {
        &self.profile.settings
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn can_afford(&self, amount: u64) -> bool {
        amount <= self.profile.balance
    }

    /// Negative input clamps to zero.
    pub fn set_balance(&mut self, balance: i128) {
        self.profile.balance = balance.clamp(0, u64::MAX as i128) as u64;
        self.persist();
        self.notify();
    }

    pub fn add_balance(&mut self, amount: u64) {
        self.profile.balance = self.profile.balance.saturating_add(amount);
        self.persist();
        self.notify();
    }

    pub fn sub_balance(&mut self, amount: u64) {
        if amount > self.profile.balance {
            warn!(
                amount,
                balance = self.profile.balance,
                "subtracting more than the balance, clamping at zero"
            );
        }
        self.profile.balance = self.profile.balance.saturating_sub(amount);
        self.persist();
        self.notify();
    }

    /// Takes a stake off the balance, or refuses without touching anything.
    pub fn debit(&mut self, amount: u64) -> Result<u64, GameError> {
        if !self.can_afford(amount) {
            return Err(GameError::InsufficientFunds {
                amount,
                balance: self.profile.balance,
            });
        }
        self.sub_balance(amount);
        Ok(self.profile.balance)
    }

    pub fn update_stats(&mut self, delta: StatsDelta) {
        self.profile.stats.merge(delta);
        self.persist();
    }

    /// Credits `payout` and records the round in one write.
    pub fn settle(
        &mut self,
        game: GameId,
        stake: u64,
        payout: u64,
        multiplier: f64,
        outcome: RoundOutcome,
    ) -> Settlement {
        self.profile.balance = self.profile.balance.saturating_add(payout);
        let delta = match outcome {
            RoundOutcome::Win => StatsDelta::win(payout),
            RoundOutcome::Loss => StatsDelta::loss(),
        };
        let delta = if game == GameId::Crash && outcome == RoundOutcome::Win {
            delta.with_crash_multiplier(multiplier)
        } else {
            delta
        };
        self.profile.stats.merge(delta);
        self.persist();
        if payout > 0 {
            self.notify();
        }
        debug!(%game, stake, payout, multiplier, outcome = outcome.as_str(), "round settled");
        Settlement {
            game,
            stake,
            payout,
            multiplier: if outcome == RoundOutcome::Win { multiplier } else { 0.0 },
            outcome,
            balance: self.profile.balance,
        }
    }

    /// Starts over at `balance` with cleared stats; settings survive.
    pub fn reset(&mut self, balance: u64) {
        self.profile.balance = balance;
        self.profile.stats = Stats::default();
        self.persist();
        self.notify();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.profile.settings.muted = muted;
        self.persist();
    }

    pub fn set_language(&mut self, code: impl Into<String>) {
        self.profile.settings.language = code.into();
        self.persist();
    }

    /// Clears the first-launch flag; returns whether it was set.
    pub fn mark_launched(&mut self) -> bool {
        let first = std::mem::replace(&mut self.profile.settings.first_launch, false);
        if first {
            self.persist();
        }
        first
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(u64) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.profile) {
            warn!(error = %e, "failed to persist profile");
        }
    }

    fn notify(&mut self) {
        let balance = self.profile.balance;
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(balance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn fresh_ledger_starts_at_default_and_persists() {
        let store = MemoryStore::new();
        let ledger = Ledger::open(store.clone(), 1_000);
        assert_eq!(ledger.balance(), 1_000);
        assert_eq!(store.snapshot().map(|p| p.balance), Some(1_000));
    }

    #[test]
    fn balance_survives_reopen() {
        let store = MemoryStore::new();
        let mut ledger = Ledger::open(store.clone(), 1_000);
        ledger.add_balance(250);
        drop(ledger);
        let reopened = Ledger::open(store, 1_000);
        assert_eq!(reopened.balance(), 1_250);
    }

    proptest! {
        #[test]
        fn add_then_sub_restores_balance(start in 0u64..u64::MAX / 2, n in 0u64..u64::MAX / 2) {
            let mut ledger = Ledger::open(MemoryStore::with_profile(Profile::new(start)), 0);
            ledger.add_balance(n);
            ledger.sub_balance(n);
            prop_assert_eq!(ledger.balance(), start);
        }
    }

    #[test]
    fn update_stats_adds_counts_and_keeps_high_water_marks() {
        let store = MemoryStore::new();
        let mut ledger = Ledger::open(store.clone(), 1_000);

        ledger.update_stats(StatsDelta::win(120).with_crash_multiplier(4.5));
        ledger.update_stats(StatsDelta::loss());
        // lower marks never pull the maxima down
        ledger.update_stats(StatsDelta::win(30).with_crash_multiplier(1.2));
        ledger.update_stats(StatsDelta {
            losses: 2,
            max_crash_multiplier: Some(f64::NAN),
            ..StatsDelta::default()
        });

        let expected = Stats {
            wins: 2,
            losses: 3,
            top_win: 120,
            max_crash_multiplier: 4.5,
        };
        assert_eq!(ledger.stats(), expected);
        assert_eq!(store.snapshot().map(|p| p.stats), Some(expected));
        assert_eq!(ledger.balance(), 1_000);
    }

    #[test]
    fn set_balance_clamps_negative() {
        let mut ledger = Ledger::open(MemoryStore::new(), 1_000);
        ledger.set_balance(-20);
        assert_eq!(ledger.balance(), 0);
        ledger.sub_balance(5);
        assert_eq!(ledger.balance(), 0);
    }

    #[test]
    fn debit_refuses_overdraft() {
        let mut ledger = Ledger::open(MemoryStore::with_profile(Profile::new(5)), 1_000);
        assert_eq!(
            ledger.debit(10),
            Err(GameError::InsufficientFunds { amount: 10, balance: 5 })
        );
        assert_eq!(ledger.balance(), 5);
        assert_eq!(ledger.debit(5), Ok(0));
    }

    #[derive(Clone, Default)]
    struct CountingStore {
        saves: Arc<Mutex<Vec<Profile>>>,
    }

    impl Store for CountingStore {
        fn load(&self) -> Result<Option<Profile>, StoreError> {
            Ok(self.saves.lock().unwrap().last().cloned())
        }

        fn save(&mut self, profile: &Profile) -> Result<(), StoreError> {
            self.saves.lock().unwrap().push(profile.clone());
            Ok(())
        }
    }

    #[test]
    fn settle_writes_credit_and_stats_together() {
        let store = CountingStore::default();
        let mut ledger = Ledger::open(store.clone(), 100);
        let before = store.saves.lock().unwrap().len();

        let s = ledger.settle(GameId::Dice, 10, 53, 5.5, RoundOutcome::Win);
        assert_eq!(s.balance, 153);

        let saves = store.saves.lock().unwrap();
        assert_eq!(saves.len(), before + 1);
        let last = saves.last().unwrap();
        assert_eq!(last.balance, 153);
        assert_eq!(last.stats.wins, 1);
        assert_eq!(last.stats.top_win, 53);
    }

    #[test]
    fn crash_wins_raise_multiplier_high_water() {
        let mut ledger = Ledger::open(MemoryStore::new(), 100);
        ledger.settle(GameId::Crash, 10, 24, 2.5, RoundOutcome::Win);
        ledger.settle(GameId::Crash, 10, 0, 7.0, RoundOutcome::Loss);
        ledger.settle(GameId::Dice, 10, 55, 5.5, RoundOutcome::Win);
        let stats = ledger.stats();
        assert_eq!(stats.max_crash_multiplier, 2.5);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.top_win, 55);
    }

    #[test]
    fn subscribers_hear_balance_changes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut ledger = Ledger::open(MemoryStore::new(), 100);
        let sink = seen.clone();
        let id = ledger.subscribe(move |b| sink.lock().unwrap().push(b));
        ledger.add_balance(5);
        ledger.debit(30).unwrap();
        assert!(ledger.unsubscribe(id));
        ledger.add_balance(1);
        assert_eq!(*seen.lock().unwrap(), vec![105, 75]);
    }

    #[test]
    fn settings_persist_with_profile() {
        let store = MemoryStore::new();
        let mut ledger = Ledger::open(store.clone(), 100);
        assert!(ledger.mark_launched());
        assert!(!ledger.mark_launched());
        ledger.set_muted(true);
        ledger.set_language("es");
        let saved = store.snapshot().unwrap();
        assert!(saved.settings.muted);
        assert!(!saved.settings.first_launch);
        assert_eq!(saved.settings.language, "es");
    }
}
