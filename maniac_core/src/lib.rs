pub mod config;
pub mod context;
pub mod crash;
pub mod driver;
pub mod effects;
pub mod error;
pub mod games;
pub mod house_edge;
pub mod ledger;
pub mod paytable;
pub mod payout;
pub mod rng;
pub mod rtp;
pub mod store;
pub mod symbols;

pub use crate::config::EngineConfig;
pub use crate::context::GameContext;
pub use crate::crash::{CrashConfig, CrashEngine, CrashEvent, CrashPhase, CrashRound};
pub use crate::driver::{CrashDriver, CrashSnapshot};
pub use crate::effects::{EffectEvent, Effects, NoEffects, RecordingEffects, TracingEffects};
pub use crate::error::{sanitize_amount, ConfigError, GameError, StoreError};
pub use crate::games::{CoinFlip, Dice, GameRules, GameScreen, Round, Slots, Taper, TaperConfig};
pub use crate::house_edge::{GamePolicy, HouseEdgeTable};
pub use crate::ledger::{Ledger, SubscriptionId};
pub use crate::paytable::{Paytable, PayoutRule, RuleMatch};
pub use crate::payout::{apply_payout, CoinSide, DiceCall, Settlement, SlotMachine, SlotSpin};
pub use crate::rng::{
    derive_hash_hex, uniform_float, uniform_int, weighted_choice, HmacRandom, RandomSource,
    SequenceRandom, ThreadRandom,
};
pub use crate::rtp::{RtpReport, SimGame, Simulation};
pub use crate::store::{JsonFileStore, MemoryStore, Store};
pub use crate::symbols::{ReelWeights, Reels, Symbol};

pub use maniac_shared::{GameId, Profile, RoundOutcome, Stats};
