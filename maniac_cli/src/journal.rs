use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use maniac_core::Settlement;
use maniac_shared::RoundRecord;

/// Append-only CSV log of settled rounds.
pub struct Journal {
    path: PathBuf,
}

pub fn record(settlement: &Settlement) -> RoundRecord {
    RoundRecord {
        ts: Utc::now(),
        game: settlement.game,
        stake: settlement.stake,
        payout: settlement.payout,
        multiplier: settlement.multiplier,
        outcome: settlement.outcome,
        balance: settlement.balance,
    }
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, record: &RoundRecord) -> anyhow::Result<()> {
        let fresh = std::fs::metadata(&self.path).map_or(true, |m| m.len() == 0);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening journal {}", self.path.display()))?;
        let mut wtr = csv::WriterBuilder::new().has_headers(fresh).from_writer(file);
        wtr.serialize(record)?;
        wtr.flush()?;
        Ok(())
    }

    /// Every record, oldest first. A missing journal reads as empty.
    pub fn read_all(&self) -> anyhow::Result<Vec<RoundRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut rdr = csv::Reader::from_reader(file);
        let mut out = Vec::new();
        for row in rdr.deserialize() {
            out.push(row.with_context(|| format!("reading journal {}", self.path.display()))?);
        }
        Ok(out)
    }

    /// The last `n` records, oldest first.
    pub fn recent(&self, n: usize) -> anyhow::Result<Vec<RoundRecord>> {
        let mut tail = VecDeque::with_capacity(n);
        for record in self.read_all()? {
            if tail.len() == n {
                tail.pop_front();
            }
            if n > 0 {
                tail.push_back(record);
            }
        }
        Ok(tail.into())
    }

    pub fn export(&self, dest: &Path) -> anyhow::Result<usize> {
        let records = self.read_all()?;
        let mut wtr = csv::Writer::from_path(dest)
            .with_context(|| format!("creating {}", dest.display()))?;
        for r in &records {
            wtr.serialize(r)?;
        }
        wtr.flush()?;
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maniac_shared::{GameId, RoundOutcome};

    fn rec(game: GameId, payout: u64, balance: u64) -> RoundRecord {
        RoundRecord {
            ts: Utc::now(),
            game,
            stake: 10,
            payout,
            multiplier: if payout > 0 { payout as f64 / 10.0 } else { 0.0 },
            outcome: if payout > 0 { RoundOutcome::Win } else { RoundOutcome::Loss },
            balance,
        }
    }

    #[test]
    fn appends_and_reads_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("rounds.csv"));
        assert!(journal.read_all().unwrap().is_empty());

        journal.append(&rec(GameId::Coin, 19, 1_009)).unwrap();
        journal.append(&rec(GameId::Dice, 0, 999)).unwrap();
        journal.append(&rec(GameId::Slots, 95, 1_084)).unwrap();

        let all = journal.read_all().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].game, GameId::Dice);
        assert_eq!(all[1].outcome, RoundOutcome::Loss);

        let last = journal.recent(2).unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].game, GameId::Dice);
        assert_eq!(last[1].balance, 1_084);
        assert!(journal.recent(0).unwrap().is_empty());
    }

    #[test]
    fn export_copies_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("rounds.csv"));
        journal.append(&rec(GameId::Crash, 38, 1_018)).unwrap();
        journal.append(&rec(GameId::Taper, 9, 1_027)).unwrap();

        let dest = dir.path().join("export.csv");
        assert_eq!(journal.export(&dest).unwrap(), 2);
        let copy = Journal::new(&dest).read_all().unwrap();
        assert_eq!(copy.len(), 2);
        assert_eq!(copy[0].payout, 38);
    }
}
