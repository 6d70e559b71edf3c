use hmac::{Hmac, Mac};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use tracing::warn;

pub type HmacSha256 = Hmac<Sha256>;

/// A source of uniform draws in `[0, 1)`.
///
/// Not cryptographically secure in general. No real money rides on these
/// games, so fairness against an adversary is not claimed.
pub trait RandomSource: Send {
    fn next_f64(&mut self) -> f64;
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }
}

/// Platform default source.
pub struct ThreadRandom {
    rng: StdRng,
}

impl ThreadRandom {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for ThreadRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for ThreadRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

pub fn derive_hash_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

/// Deterministic stream: HMAC-SHA256(server_seed, "client_seed:nonce"),
/// extended by re-hashing the previous block once its bytes run out.
pub struct HmacRandom {
    server_seed: String,
    block: [u8; 32],
    cursor: usize,
}

impl HmacRandom {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        let server_seed = server_seed.into();
        let client_seed: String = client_seed.into();
        let block = hmac_block(&server_seed, &client_seed, nonce);
        Self {
            server_seed,
            block,
            cursor: 0,
        }
    }

    pub fn server_seed_hash_hex(&self) -> String {
        derive_hash_hex(self.server_seed.as_bytes())
    }

    fn next_u32(&mut self) -> u32 {
        if self.cursor + 4 > self.block.len() {
            self.block = Sha256::digest(self.block).into();
            self.cursor = 0;
        }
        let chunk = &self.block[self.cursor..self.cursor + 4];
        self.cursor += 4;
        u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
    }
}

fn hmac_block(server_seed: &str, client_seed: &str, nonce: u64) -> [u8; 32] {
    let mut mac =
        HmacSha256::new_from_slice(server_seed.as_bytes()).expect("HMAC takes keys of any size");
    mac.update(format!("{client_seed}:{nonce}").as_bytes());
    mac.finalize().into_bytes().into()
}

impl RandomSource for HmacRandom {
    fn next_f64(&mut self) -> f64 {
        (self.next_u32() as f64) / (u32::MAX as f64 + 1.0)
    }
}

/// Replays a fixed list of draws, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    draws: Vec<f64>,
    index: usize,
}

impl SequenceRandom {
    pub fn new(draws: impl Into<Vec<f64>>) -> Self {
        let draws = draws
            .into()
            .into_iter()
            .map(|d| if d.is_finite() { d.clamp(0.0, 1.0 - f64::EPSILON) } else { 0.0 })
            .collect();
        Self { draws, index: 0 }
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let d = self.draws[self.index % self.draws.len()];
        self.index += 1;
        d
    }
}

/// `min <= x < max`.
pub fn uniform_float<R: RandomSource + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    min + rng.next_f64() * (max - min)
}

/// Integer in `[min, max]` inclusive.
pub fn uniform_int<R: RandomSource + ?Sized>(rng: &mut R, min: i64, max: i64) -> i64 {
    let x = uniform_float(rng, min as f64, (max + 1) as f64).floor() as i64;
    // float rounding can land exactly on max + 1
    x.min(max)
}

/// Picks one key with probability `weight / total`, walking `table` in order.
///
/// A table whose weights sum to zero is degenerate: the first key is
/// returned and a warning is logged. Callers must not rely on that.
pub fn weighted_choice<'a, K, R>(rng: &mut R, table: &'a [(K, u32)]) -> Option<&'a K>
where
    R: RandomSource + ?Sized,
{
    let (first, _) = table.first()?;
    let total: u64 = table.iter().map(|(_, w)| *w as u64).sum();
    if total == 0 {
        warn!(entries = table.len(), "weighted choice over zero total weight");
        return Some(first);
    }
    let mut r = rng.next_f64() * total as f64;
    for (key, weight) in table {
        r -= *weight as f64;
        if r < 0.0 {
            return Some(key);
        }
    }
    // only reachable through rounding at the top of the range
    table.iter().rev().find(|(_, w)| *w > 0).map(|(k, _)| k)
}
