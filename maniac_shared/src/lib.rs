use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Starting balance credited to a fresh profile.
pub const DEFAULT_STARTING_BALANCE: u64 = 1_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameId {
    Coin,
    Dice,
    Crash,
    Slots,
    Taper,
}

impl GameId {
    pub const ALL: [GameId; 5] = [
        GameId::Coin,
        GameId::Dice,
        GameId::Crash,
        GameId::Slots,
        GameId::Taper,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GameId::Coin => "coin",
            GameId::Dice => "dice",
            GameId::Crash => "crash",
            GameId::Slots => "slots",
            GameId::Taper => "taper",
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameId {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coin" | "coinflip" => Ok(GameId::Coin),
            "dice" => Ok(GameId::Dice),
            "crash" => Ok(GameId::Crash),
            "slots" | "slot" => Ok(GameId::Slots),
            "taper" | "tap" => Ok(GameId::Taper),
            other => Err(SharedError::UnknownGame(other.to_string())),
        }
    }
}

/// Aggregate counters. `top_win` and `max_crash_multiplier` are high-water
/// marks; `wins` and `losses` only grow.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Stats {
    pub wins: u64,
    pub losses: u64,
    pub top_win: u64,
    pub max_crash_multiplier: f64,
}

/// Partial update merged into [`Stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsDelta {
    pub wins: u64,
    pub losses: u64,
    pub top_win: Option<u64>,
    pub max_crash_multiplier: Option<f64>,
}

impl StatsDelta {
    pub fn win(payout: u64) -> Self {
        Self {
            wins: 1,
            top_win: Some(payout),
            ..Self::default()
        }
    }

    pub fn loss() -> Self {
        Self {
            losses: 1,
            ..Self::default()
        }
    }

    pub fn with_crash_multiplier(mut self, multiplier: f64) -> Self {
        self.max_crash_multiplier = Some(multiplier);
        self
    }
}

impl Stats {
    pub fn merge(&mut self, delta: StatsDelta) {
        self.wins = self.wins.saturating_add(delta.wins);
        self.losses = self.losses.saturating_add(delta.losses);
        if let Some(win) = delta.top_win {
            self.top_win = self.top_win.max(win);
        }
        if let Some(m) = delta.max_crash_multiplier {
            if m.is_finite() && m > self.max_crash_multiplier {
                self.max_crash_multiplier = m;
            }
        }
    }

    pub fn rounds(&self) -> u64 {
        self.wins.saturating_add(self.losses)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub muted: bool,
    pub language: String,
    pub first_launch: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            muted: false,
            language: "en".to_string(),
            first_launch: true,
        }
    }
}

/// Everything that survives a restart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Profile {
    pub balance: u64,
    pub stats: Stats,
    pub settings: Settings,
}

impl Profile {
    pub fn new(balance: u64) -> Self {
        Self {
            balance,
            stats: Stats::default(),
            settings: Settings::default(),
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_BALANCE)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundOutcome {
    Win,
    Loss,
}

impl RoundOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundOutcome::Win => "win",
            RoundOutcome::Loss => "loss",
        }
    }
}

/// One settled round, as written to the journal.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoundRecord {
    pub ts: DateTime<Utc>,
    pub game: GameId,
    pub stake: u64,
    pub payout: u64,
    pub multiplier: f64,
    pub outcome: RoundOutcome,
    pub balance: u64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("unknown game: {0}")]
    UnknownGame(String),
}
