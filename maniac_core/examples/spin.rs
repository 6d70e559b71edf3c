use std::sync::Arc;

use maniac_core::{
    GameContext, HmacRandom, HouseEdgeTable, Ledger, MemoryStore, NoEffects, Slots,
};

fn main() {
    // Example end-to-end spin against a throwaway ledger
    let rng = HmacRandom::new("example-server-seed", "example-client-seed", 1);
    let commitment = rng.server_seed_hash_hex();
    let mut ctx = GameContext::new(
        Ledger::open(MemoryStore::new(), 1_000),
        rng,
        Arc::new(HouseEdgeTable::default()),
        NoEffects,
    );
    let mut slots = Slots::default();
    match slots.spin(&mut ctx, 10) {
        Ok(Some(round)) => println!(
            "server_seed_hash={} reels={} payout={} balance={}",
            commitment,
            round.draw.iter().map(|s| s.glyph()).collect::<String>(),
            round.settlement.payout,
            round.settlement.balance
        ),
        Ok(None) => println!("spin already in flight"),
        Err(e) => println!("spin rejected: {e}"),
    }
}
