use maniac_shared::GameId;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Edge applied to a game missing from the table.
pub const DEFAULT_EDGE: f64 = 0.03;
/// Hard ceiling applied to a game missing from the table.
pub const DEFAULT_MAX_BET: u64 = 10_000;
/// Share of the balance a single bet may take.
pub const DEFAULT_BET_FRACTION: f64 = 0.10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GamePolicy {
    pub edge: f64,
    pub max_bet: u64,
}

/// Per-game edge and bet ceilings. Built once and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HouseEdgeTable {
    pub bet_fraction: f64,
    /// Entries read from config land on top of the default table.
    #[serde(deserialize_with = "games_over_defaults")]
    pub games: BTreeMap<GameId, GamePolicy>,
}

fn games_over_defaults<'de, D>(deserializer: D) -> Result<BTreeMap<GameId, GamePolicy>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<GameId, GamePolicy>::deserialize(deserializer)?;
    let mut games = HouseEdgeTable::default().games;
    games.extend(overrides);
    Ok(games)
}

impl Default for HouseEdgeTable {
    fn default() -> Self {
        let games = [
            (GameId::Coin, 0.02, 5_000),
            (GameId::Dice, 0.02, 5_000),
            (GameId::Crash, 0.04, 10_000),
            (GameId::Slots, 0.05, 2_000),
            (GameId::Taper, 0.03, 10_000),
        ]
        .into_iter()
        .map(|(game, edge, max_bet)| (game, GamePolicy { edge, max_bet }))
        .collect();
        Self {
            bet_fraction: DEFAULT_BET_FRACTION,
            games,
        }
    }
}

impl HouseEdgeTable {
    /// A table with no per-game entries: every game gets the defaults.
    pub fn empty() -> Self {
        Self {
            bet_fraction: DEFAULT_BET_FRACTION,
            games: BTreeMap::new(),
        }
    }

    pub fn edge_for(&self, game: GameId) -> f64 {
        self.games.get(&game).map_or(DEFAULT_EDGE, |p| p.edge)
    }

    pub fn hard_ceiling(&self, game: GameId) -> u64 {
        self.games.get(&game).map_or(DEFAULT_MAX_BET, |p| p.max_bet)
    }

    /// `min(hard ceiling, floor(balance * bet_fraction))`.
    pub fn max_bet(&self, game: GameId, balance: u64) -> u64 {
        let share = (balance as f64 * self.bet_fraction).floor() as u64;
        self.hard_ceiling(game).min(share).min(balance)
    }

    pub fn is_bet_valid(&self, game: GameId, amount: u64, balance: u64) -> bool {
        amount >= 1 && amount <= self.max_bet(game, balance)
    }

    /// Credited amount for a pre-edge payout on `game`.
    pub fn apply(&self, game: GameId, theoretical: f64) -> u64 {
        crate::payout::apply_payout(theoretical, self.edge_for(game))
    }
}
