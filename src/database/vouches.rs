//! Vouch repository - persistence for the ledger and its flags

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::database::pool::with_read_retry;
use crate::ledger::{Flag, Vouch};

pub struct VouchRepository {
    pool: PgPool,
}

impl VouchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<(), String> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vouches (
                id BIGINT PRIMARY KEY,
                from_agent_id BIGINT NOT NULL,
                to_agent_id BIGINT NOT NULL,
                score SMALLINT NOT NULL,
                note TEXT NOT NULL DEFAULT '',
                receipt_url TEXT,
                flags_count INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create vouches table: {}", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS flags (
                id BIGINT PRIMARY KEY,
                vouch_id BIGINT NOT NULL REFERENCES vouches(id),
                flagged_by_agent_id BIGINT NOT NULL,
                reason TEXT NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                UNIQUE(vouch_id, flagged_by_agent_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create flags table: {}", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_vouches_to ON vouches(to_agent_id, id DESC)")
            .execute(&self.pool)
            .await
            .map_err(|e| format!("Failed to create vouches target index: {}", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_vouches_from ON vouches(from_agent_id, id DESC)")
            .execute(&self.pool)
            .await
            .map_err(|e| format!("Failed to create vouches source index: {}", e))?;

        Ok(())
    }

    pub async fn insert_vouch(&self, vouch: &Vouch) -> Result<(), String> {
        sqlx::query(
            r#"
            INSERT INTO vouches
                (id, from_agent_id, to_agent_id, score, note, receipt_url,
                 flags_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(vouch.id)
        .bind(vouch.from_agent_id)
        .bind(vouch.to_agent_id)
        .bind(vouch.score as i16)
        .bind(&vouch.note)
        .bind(&vouch.receipt_url)
        .bind(vouch.flags_count as i32)
        .bind(vouch.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to insert vouch: {}", e))?;

        Ok(())
    }

    /// Journal a flag and the vouch's new flag count in one transaction.
    pub async fn insert_flag(&self, flag: &Flag, flags_count: u32) -> Result<(), String> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| format!("Failed to begin flag transaction: {}", e))?;

        sqlx::query(
            r#"
            INSERT INTO flags (id, vouch_id, flagged_by_agent_id, reason, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(flag.id)
        .bind(flag.vouch_id)
        .bind(flag.flagged_by_agent_id)
        .bind(&flag.reason)
        .bind(flag.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| format!("Failed to insert flag: {}", e))?;

        sqlx::query("UPDATE vouches SET flags_count = $2 WHERE id = $1")
            .bind(flag.vouch_id)
            .bind(flags_count as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| format!("Failed to update flag count: {}", e))?;

        tx.commit()
            .await
            .map_err(|e| format!("Failed to commit flag transaction: {}", e))?;

        Ok(())
    }

    /// All vouches in creation order, so supersession indexes rebuild
    /// faithfully at boot.
    pub async fn load_all_vouches(&self) -> Result<Vec<Vouch>, String> {
        let rows = with_read_retry("load vouches", || {
            sqlx::query(
                r#"
                SELECT id, from_agent_id, to_agent_id, score, note,
                       receipt_url, flags_count, created_at
                FROM vouches
                ORDER BY id
                "#,
            )
            .fetch_all(&self.pool)
        })
        .await?;

        let vouches = rows
            .into_iter()
            .map(|row| {
                let score: i16 = row.get("score");
                let flags_count: i32 = row.get("flags_count");
                let created_at: DateTime<Utc> = row.get("created_at");
                Vouch {
                    id: row.get("id"),
                    from_agent_id: row.get("from_agent_id"),
                    to_agent_id: row.get("to_agent_id"),
                    score: score as i8,
                    note: row.get("note"),
                    receipt_url: row.get("receipt_url"),
                    flags_count: flags_count as u32,
                    created_at,
                }
            })
            .collect();

        Ok(vouches)
    }

    pub async fn load_all_flags(&self) -> Result<Vec<Flag>, String> {
        let rows = with_read_retry("load flags", || {
            sqlx::query(
                r#"
                SELECT id, vouch_id, flagged_by_agent_id, reason, created_at
                FROM flags
                ORDER BY id
                "#,
            )
            .fetch_all(&self.pool)
        })
        .await?;

        let flags = rows
            .into_iter()
            .map(|row| {
                let created_at: DateTime<Utc> = row.get("created_at");
                Flag {
                    id: row.get("id"),
                    vouch_id: row.get("vouch_id"),
                    flagged_by_agent_id: row.get("flagged_by_agent_id"),
                    reason: row.get("reason"),
                    created_at,
                }
            })
            .collect();

        Ok(flags)
    }
}
