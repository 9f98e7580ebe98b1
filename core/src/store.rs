//! SQLite persistence for fuzz campaigns.
//!
//! RULE: Only store.rs talks to the database.
//! The runner hands over finished BotResults; it never executes SQL directly.

use crate::{
    error::SimResult,
    fuzz::BotResult,
    types::BotId,
    validator::Severity,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

pub struct CampaignStore {
    conn: Connection,
}

/// Bug counts for one campaign, by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BugTally {
    pub errors: u64,
    pub warnings: u64,
    pub anomalies: u64,
}

impl BugTally {
    pub fn total(&self) -> u64 {
        self.errors + self.warnings + self.anomalies
    }
}

impl CampaignStore {
    /// Open (or create) the campaign database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_campaign.sql"))?;
        Ok(())
    }

    // ── Campaign ───────────────────────────────────────────────

    pub fn insert_campaign(
        &self,
        campaign_id: &str,
        master_seed: u64,
        policy: &str,
        num_bots: u32,
        actions_per_bot: u64,
        started_at: DateTime<Utc>,
    ) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO campaign (campaign_id, master_seed, policy, num_bots, actions_per_bot, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                campaign_id,
                // SQLite integers are signed; the bit pattern round-trips.
                master_seed as i64,
                policy,
                num_bots,
                actions_per_bot as i64,
                started_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ── Bot runs ───────────────────────────────────────────────

    /// Store one bot and all of its bugs in a single transaction.
    pub fn record_bot(&mut self, campaign_id: &str, bot: &BotResult) -> SimResult<()> {
        let state_json = serde_json::to_string(&bot.final_state)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO bot_run (campaign_id, bot_id, seed, steps, stopped_early, elapsed_ms,
                                  final_state_json, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                campaign_id,
                bot.bot_id,
                bot.seed as i64,
                bot.steps as i64,
                bot.stopped_early,
                bot.elapsed.as_millis() as i64,
                state_json,
                Utc::now().to_rfc3339(),
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO bug_report (campaign_id, bot_id, severity, category, area, action, message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for bug in &bot.bugs {
                stmt.execute(params![
                    campaign_id,
                    bot.bot_id,
                    bug.severity.to_string(),
                    bug.category.name(),
                    bug.area.name(),
                    bug.action,
                    bug.message,
                ])?;
            }
        }
        tx.commit()?;
        log::debug!(
            "stored bot {} ({} bugs) for campaign {campaign_id}",
            bot.bot_id,
            bot.bugs.len()
        );
        Ok(())
    }

    pub fn bug_counts(&self, campaign_id: &str) -> SimResult<BugTally> {
        let mut stmt = self.conn.prepare(
            "SELECT severity, COUNT(*) FROM bug_report
             WHERE campaign_id = ?1 GROUP BY severity",
        )?;
        let rows = stmt
            .query_map(params![campaign_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tally = BugTally::default();
        for (severity, count) in rows {
            if severity == Severity::Error.to_string() {
                tally.errors = count;
            } else if severity == Severity::Warning.to_string() {
                tally.warnings = count;
            } else if severity == Severity::Anomaly.to_string() {
                tally.anomalies = count;
            }
        }
        Ok(tally)
    }

    /// (bot id, seed) pairs, for replaying individual bots.
    pub fn bot_seeds(&self, campaign_id: &str) -> SimResult<Vec<(BotId, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT bot_id, seed FROM bot_run WHERE campaign_id = ?1 ORDER BY bot_id ASC",
        )?;
        let seeds = stmt
            .query_map(params![campaign_id], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(seeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pragma<T: rusqlite::types::FromSql>(store: &CampaignStore, name: &str) -> T {
        store
            .conn
            .query_row(&format!("PRAGMA {name}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn file_database_opens_in_wal_mode() {
        let path = std::env::temp_dir().join(format!("lootsim-{}.db", uuid::Uuid::new_v4()));
        let path = path.to_string_lossy().into_owned();
        {
            let store = CampaignStore::open(&path).unwrap();
            assert_eq!(pragma::<String>(&store, "journal_mode"), "wal");
            assert_eq!(pragma::<i64>(&store, "foreign_keys"), 1);
        }
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{path}{suffix}"));
        }
    }

    #[test]
    fn memory_path_opens_cleanly() {
        let store = CampaignStore::open(":memory:").unwrap();
        assert_eq!(pragma::<String>(&store, "journal_mode"), "memory");
    }
}
