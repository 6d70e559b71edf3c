use maniac_shared::GameId;

use crate::crash::CrashPhase;

/// A rejected player action. Nothing has been debited when one of these
/// comes back.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("insufficient funds: bet {amount} exceeds balance {balance}")]
    InsufficientFunds { amount: u64, balance: u64 },
    #[error("bet {amount} above the {game} limit of {max}")]
    AboveLimit { game: GameId, amount: u64, max: u64 },
    #[error("that call can never win at {game}")]
    InvalidCall { game: GameId },
    #[error("betting is closed while the round is {phase}")]
    BettingClosed { phase: CrashPhase },
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("edge {edge} for {game} is outside [0, 1)")]
    InvalidEdge { game: GameId, edge: f64 },
    #[error("bet fraction {0} is outside (0, 1]")]
    InvalidFraction(f64),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Whole credits from a raw front-end amount. NaN, non-positive and
/// sub-unit inputs clamp to 1 instead of being rejected.
pub fn sanitize_amount(raw: f64) -> u64 {
    if raw.is_nan() || raw < 1.0 {
        return 1;
    }
    if raw >= u64::MAX as f64 {
        return u64::MAX;
    }
    raw.floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_bad_input_to_one() {
        assert_eq!(sanitize_amount(f64::NAN), 1);
        assert_eq!(sanitize_amount(-5.0), 1);
        assert_eq!(sanitize_amount(0.0), 1);
        assert_eq!(sanitize_amount(0.4), 1);
        assert_eq!(sanitize_amount(12.9), 12);
        assert_eq!(sanitize_amount(f64::INFINITY), u64::MAX);
    }
}
