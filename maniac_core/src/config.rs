use maniac_shared::{GameId, DEFAULT_STARTING_BALANCE};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    crash::CrashConfig, error::ConfigError, games::TaperConfig, house_edge::HouseEdgeTable,
    payout::SlotMachine, symbols::ReelWeights,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub starting_balance: u64,
    pub house: HouseEdgeTable,
    pub crash: CrashConfig,
    pub taper: TaperConfig,
    pub slots: ReelWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            house: HouseEdgeTable::default(),
            crash: CrashConfig::default(),
            taper: TaperConfig::default(),
            slots: ReelWeights::default(),
        }
    }
}

fn read_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Defaults, then the optional JSON file, then `MANIAC_*` overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Standard paytable over the configured reel weights.
    pub fn slot_machine(&self) -> SlotMachine {
        SlotMachine {
            weights: self.slots.clone(),
            ..SlotMachine::default()
        }
    }

    pub fn apply_env(&mut self) {
        if let Some(v) = read_env("MANIAC_STARTING_BALANCE") {
            self.starting_balance = v;
        }
        if let Some(v) = read_env("MANIAC_BET_FRACTION") {
            self.house.bet_fraction = v;
        }
        if let Some(v) = read_env("MANIAC_CRASH_COUNTDOWN_MS") {
            self.crash.countdown_ms = v;
        }
        if let Some(v) = read_env("MANIAC_CRASH_PAUSE_MS") {
            self.crash.pause_ms = v;
        }
        if let Some(v) = read_env("MANIAC_CRASH_TICK_MS") {
            self.crash.tick_ms = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for game in GameId::ALL {
            let edge = self.house.edge_for(game);
            if !(0.0..1.0).contains(&edge) {
                return Err(ConfigError::InvalidEdge { game, edge });
            }
        }
        let fraction = self.house.bet_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigError::InvalidFraction(fraction));
        }
        let c = &self.crash;
        if !(c.alpha > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "crash alpha {} must be positive",
                c.alpha
            )));
        }
        if !(c.growth_base > 1.0 && c.growth_rate > 0.0) {
            return Err(ConfigError::Invalid("crash curve must grow".to_string()));
        }
        if !(c.min_point >= 1.0 && c.min_point <= c.max_point) {
            return Err(ConfigError::Invalid(format!(
                "crash range [{}, {}] is empty or below 1.00",
                c.min_point, c.max_point
            )));
        }
        if c.countdown_ms == 0 || c.tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "crash countdown and tick must be non-zero".to_string(),
            ));
        }
        if self.slots.total() == 0 {
            return Err(ConfigError::Invalid("slot reel weights sum to zero".to_string()));
        }
        if self.taper.combo_step < 0.0 || self.taper.max_combo < 1.0 {
            return Err(ConfigError::Invalid("taper combo must not shrink rewards".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Symbol;

    #[test]
    fn defaults_validate() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.starting_balance, 1_000);
        assert_eq!(config.crash.countdown_ms, 7_000);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{
                "starting_balance": 250,
                "house": { "games": { "slots": { "edge": 0.1, "max_bet": 50 } } },
                "crash": { "pause_ms": 3000 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.starting_balance, 250);
        assert_eq!(config.house.edge_for(GameId::Slots), 0.1);
        // games left out of the file keep their own defaults
        assert_eq!(config.house.edge_for(GameId::Coin), 0.02);
        assert_eq!(config.house.edge_for(GameId::Crash), 0.04);
        assert_eq!(config.house.hard_ceiling(GameId::Dice), 5_000);
        assert_eq!(config.house.bet_fraction, 0.10);
        assert_eq!(config.crash.pause_ms, 3_000);
        assert_eq!(config.crash.countdown_ms, 7_000);
    }

    #[test]
    fn reel_weights_come_from_config() {
        let config = EngineConfig::from_json_str(
            r#"{ "slots": [["cherry", 10], ["lemon", 10], ["diamond", 80]] }"#,
        )
        .unwrap();
        let machine = config.slot_machine();
        assert_eq!(machine.weights.total(), 100);
        assert_eq!(machine.weights.weight_of(Symbol::Diamond), 80);
        assert_eq!(machine.weights.weight_of(Symbol::Bell), 0);
        assert_eq!(EngineConfig::default().slot_machine().weights, ReelWeights::default());
    }

    #[test]
    fn rejects_zero_reel_weights() {
        let err = EngineConfig::from_json_str(r#"{ "slots": [["cherry", 0]] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_edge_of_one() {
        let err = EngineConfig::from_json_str(
            r#"{ "house": { "games": { "dice": { "edge": 1.0, "max_bet": 5 } } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEdge { game: GameId::Dice, .. }));
    }

    #[test]
    fn rejects_bad_crash_range() {
        let err =
            EngineConfig::from_json_str(r#"{ "crash": { "min_point": 5.0, "max_point": 2.0 } }"#)
                .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_fraction() {
        let err =
            EngineConfig::from_json_str(r#"{ "house": { "bet_fraction": 0.0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFraction(_)));
    }
}
