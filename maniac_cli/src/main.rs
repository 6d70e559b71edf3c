mod journal;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use maniac_core::{
    rtp::{theoretical_crash_rtp, theoretical_slots_rtp},
    sanitize_amount, CoinFlip, CoinSide, CrashDriver, CrashEvent, Dice, DiceCall, EngineConfig,
    GameContext, GameId, JsonFileStore, Ledger, RoundOutcome, Settlement, SimGame, Simulation,
    Slots, Taper, ThreadRandom, TracingEffects,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::journal::{record, Journal};

#[derive(Parser)]
#[command(name = "maniac", about = "Casino mini-games against a local balance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Profile file
    #[arg(long, env = "MANIAC_STATE", default_value = "maniac_state.json")]
    state: PathBuf,
    /// CSV journal of settled rounds
    #[arg(long, env = "MANIAC_JOURNAL", default_value = "maniac_rounds.csv")]
    journal: PathBuf,
    /// JSON engine config
    #[arg(long, env = "MANIAC_CONFIG")]
    config: Option<PathBuf>,
    /// Seed for reproducible draws
    #[arg(long, env = "MANIAC_SEED")]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the balance and per-game bet limits
    Balance,
    /// Show lifetime stats
    Stats,
    /// Start over with a fresh balance
    Reset {
        #[arg(long)]
        balance: Option<u64>,
    },
    /// Flip a coin
    Coin { bet: f64, side: Side },
    /// Roll a die
    Dice {
        bet: f64,
        #[command(flatten)]
        call: DiceArgs,
    },
    /// Spin the reels
    Slots { bet: f64 },
    /// Tap for credits, then collect
    Tap {
        #[arg(long, default_value_t = 10)]
        count: u32,
        /// Gap between taps
        #[arg(long, default_value_t = 200)]
        interval_ms: u64,
    },
    /// Ride one crash round, cashing out at the target
    Crash {
        bet: f64,
        #[arg(long)]
        target: f64,
    },
    /// Estimate return-to-player without touching the balance
    Simulate {
        game: SimChoice,
        #[arg(long, default_value_t = 100_000)]
        rounds: u64,
        #[arg(long, default_value_t = 10)]
        bet: u64,
        #[arg(long, default_value_t = 2.0)]
        target: f64,
    },
    /// Print the most recent rounds
    History {
        #[arg(short, default_value_t = 20)]
        n: usize,
    },
    /// Copy the journal to another CSV
    Export { path: PathBuf },
    /// Show or change settings
    Settings {
        #[arg(long, conflicts_with = "unmute")]
        mute: bool,
        #[arg(long)]
        unmute: bool,
        #[arg(long)]
        language: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Heads,
    Tails,
}

impl From<Side> for CoinSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Heads => CoinSide::Heads,
            Side::Tails => CoinSide::Tails,
        }
    }
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct DiceArgs {
    #[arg(long)]
    even: bool,
    #[arg(long)]
    odd: bool,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=6))]
    exact: Option<u8>,
}

impl DiceArgs {
    fn call(&self) -> DiceCall {
        match (self.even, self.odd, self.exact) {
            (_, _, Some(face)) => DiceCall::Exact(face),
            (true, _, _) => DiceCall::Even,
            _ => DiceCall::Odd,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SimChoice {
    Coin,
    DiceParity,
    DiceExact,
    Slots,
    Crash,
}

fn context(cli: &Cli, config: &EngineConfig) -> GameContext {
    let ledger = Ledger::open(JsonFileStore::new(&cli.state), config.starting_balance);
    let effects = TracingEffects {
        muted: ledger.settings().muted,
    };
    let rng = match cli.seed {
        Some(seed) => ThreadRandom::seeded(seed),
        None => ThreadRandom::new(),
    };
    GameContext::new(ledger, rng, Arc::new(config.house.clone()), effects)
}

fn report(journal: &Journal, settlement: &Settlement) {
    let verdict = match settlement.outcome {
        RoundOutcome::Win => format!("won {} (x{:.2})", settlement.payout, settlement.multiplier),
        RoundOutcome::Loss => format!("lost {}", settlement.stake),
    };
    println!("{verdict}, balance {}", settlement.balance);
    if let Err(e) = journal.append(&record(settlement)) {
        warn!(error = %e, "could not write round journal");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref()).context("loading engine config")?;
    let journal = Journal::new(&cli.journal);
    let mut ctx = context(&cli, &config);
    if ctx.ledger.mark_launched() {
        println!("welcome, starting balance {}", ctx.ledger.balance());
    }

    match cli.command {
        Commands::Balance => {
            println!("balance {}", ctx.ledger.balance());
            for game in GameId::ALL {
                println!("  {:<6} max bet {}", game, ctx.max_bet(game));
            }
        }
        Commands::Stats => {
            let stats = ctx.ledger.stats();
            println!("rounds    {}", stats.rounds());
            println!("wins      {}", stats.wins);
            println!("losses    {}", stats.losses);
            println!("top win   {}", stats.top_win);
            println!("best crash x{:.2}", stats.max_crash_multiplier);
        }
        Commands::Reset { balance } => {
            let balance = balance.unwrap_or(config.starting_balance);
            ctx.ledger.reset(balance);
            println!("balance reset to {balance}");
        }
        Commands::Coin { bet, side } => {
            let mut coin = CoinFlip::new();
            if let Some(round) = coin.play(&mut ctx, sanitize_amount(bet), side.into())? {
                let landed = if round.draw == CoinSide::Heads { "heads" } else { "tails" };
                print!("landed {landed}: ");
                report(&journal, &round.settlement);
            }
        }
        Commands::Dice { bet, call } => {
            let mut dice = Dice::new();
            if let Some(round) = dice.play(&mut ctx, sanitize_amount(bet), call.call())? {
                print!("rolled {}: ", round.draw);
                report(&journal, &round.settlement);
            }
        }
        Commands::Slots { bet } => {
            let mut slots = Slots::new(config.slot_machine());
            if let Some(round) = slots.spin(&mut ctx, sanitize_amount(bet))? {
                let reels: String = round.draw.iter().map(|s| s.glyph()).collect();
                match slots.rule_for(&round.draw) {
                    Some(rule) => print!("{reels} {rule}: "),
                    None => print!("{reels}: "),
                }
                report(&journal, &round.settlement);
            }
        }
        Commands::Tap { count, interval_ms } => {
            let mut taper = Taper::new(config.taper.clone(), Duration::ZERO);
            let mut taps = 0;
            for i in 0..u64::from(count) {
                let now = Duration::from_millis(i * interval_ms);
                match taper.tap(&ctx, now) {
                    Some(_) => taps += 1,
                    None => break,
                }
            }
            println!(
                "{taps} taps, combo x{:.1}, {:.1} credits accrued",
                taper.combo(),
                taper.accrued()
            );
            match taper.collect(&mut ctx) {
                Some(settlement) => report(&journal, &settlement),
                None => println!("not enough to collect yet"),
            }
        }
        Commands::Crash { bet, target } => {
            if !(target > 1.0) {
                anyhow::bail!("target must be above 1.00");
            }
            ride_crash(ctx, &config, &journal, sanitize_amount(bet), target).await?;
        }
        Commands::Simulate {
            game,
            rounds,
            bet,
            target,
        } => {
            let machine = config.slot_machine();
            let sim = Simulation {
                house: &config.house,
                machine: &machine,
                crash: &config.crash,
            };
            let game = match game {
                SimChoice::Coin => SimGame::Coin,
                SimChoice::DiceParity => SimGame::DiceParity,
                SimChoice::DiceExact => SimGame::DiceExact,
                SimChoice::Slots => SimGame::Slots,
                SimChoice::Crash => SimGame::Crash { target },
            };
            let mut rng = match cli.seed {
                Some(seed) => ThreadRandom::seeded(seed),
                None => ThreadRandom::new(),
            };
            let result = sim.run(game, rounds, bet, &mut rng);
            println!(
                "{} rounds: rtp {:.4}, hit rate {:.4}, house edge {:.4}",
                result.rounds,
                result.rtp(),
                result.hit_rate(),
                result.house_edge()
            );
            let edge = config.house.edge_for(game.game());
            match game {
                SimGame::Slots => {
                    println!("exact rtp {:.4}", theoretical_slots_rtp(&machine, edge))
                }
                SimGame::Crash { target } => println!(
                    "exact rtp {:.4}",
                    theoretical_crash_rtp(&config.crash, target, edge)
                ),
                _ => {}
            }
        }
        Commands::History { n } => {
            for r in journal.recent(n)? {
                println!(
                    "{} {:<6} stake {:>6} payout {:>7} x{:<6.2} {:<4} balance {}",
                    r.ts.format("%Y-%m-%d %H:%M:%S"),
                    r.game,
                    r.stake,
                    r.payout,
                    r.multiplier,
                    r.outcome.as_str(),
                    r.balance
                );
            }
        }
        Commands::Export { path } => {
            let total = journal.export(&path)?;
            println!("exported {} rounds to {}", total, path.display());
        }
        Commands::Settings {
            mute,
            unmute,
            language,
        } => {
            if mute || unmute {
                ctx.ledger.set_muted(mute);
            }
            if let Some(code) = language {
                ctx.ledger.set_language(code);
            }
            let settings = ctx.ledger.settings();
            println!("muted {}, language {}", settings.muted, settings.language);
        }
    }

    Ok(())
}

async fn ride_crash(
    ctx: GameContext,
    config: &EngineConfig,
    journal: &Journal,
    bet: u64,
    target: f64,
) -> anyhow::Result<()> {
    let mut driver = CrashDriver::start(ctx, config.crash.clone());
    let mut rx = driver.subscribe();
    if driver.place_bet(bet).await?.is_none() {
        anyhow::bail!("stake already placed this round");
    }
    let snap = driver.snapshot().await;
    let round_id = snap.round.id;
    println!(
        "round {round_id}: staked {bet}, launching in {:.1}s",
        snap.countdown_remaining.as_secs_f64()
    );

    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "crash events dropped");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        if event.round_id() != round_id {
            continue;
        }
        match event {
            CrashEvent::Launched { .. } => println!("launched"),
            CrashEvent::Multiplier { multiplier, .. } if multiplier >= target => {
                if let Some(settlement) = driver.cash_out().await {
                    report(journal, &settlement);
                }
            }
            CrashEvent::Crashed {
                crash_point,
                lost_stake,
                ..
            } => {
                println!("crashed at x{crash_point:.2}");
                if let Some(stake) = lost_stake {
                    let balance = driver.snapshot().await.balance;
                    report(
                        journal,
                        &Settlement {
                            game: GameId::Crash,
                            stake,
                            payout: 0,
                            multiplier: 0.0,
                            outcome: RoundOutcome::Loss,
                            balance,
                        },
                    );
                }
                break;
            }
            _ => {}
        }
    }
    driver.shutdown();
    info!(round_id, "crash session over");
    Ok(())
}
