//! Agent repository - persistence for agent records and credentials

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::database::pool::with_read_retry;
use crate::identity::{Agent, CredentialRecord};

pub struct AgentRepository {
    pool: PgPool,
}

impl AgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<(), String> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agents (
                id BIGINT PRIMARY KEY,
                name VARCHAR(64) NOT NULL,
                name_key VARCHAR(64) NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                reputation DOUBLE PRECISION NOT NULL DEFAULT 0.0,
                is_claimed BOOLEAN NOT NULL DEFAULT FALSE,
                api_key_salt VARCHAR(64) NOT NULL,
                api_key_hash VARCHAR(64) NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create agents table: {}", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_agents_reputation ON agents(reputation DESC)")
            .execute(&self.pool)
            .await
            .map_err(|e| format!("Failed to create agents reputation index: {}", e))?;

        Ok(())
    }

    /// Journal a freshly registered agent. Only the salted hash is
    /// written; the plaintext key never reaches this layer.
    pub async fn insert(&self, agent: &Agent) -> Result<(), String> {
        sqlx::query(
            r#"
            INSERT INTO agents
                (id, name, name_key, description, reputation, is_claimed,
                 api_key_salt, api_key_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(agent.id)
        .bind(&agent.name)
        .bind(agent.name.to_lowercase())
        .bind(&agent.description)
        .bind(agent.reputation)
        .bind(agent.is_claimed)
        .bind(&agent.credential.salt)
        .bind(&agent.credential.key_hash)
        .bind(agent.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to insert agent: {}", e))?;

        Ok(())
    }

    pub async fn update_reputation(&self, agent_id: i64, reputation: f64) -> Result<(), String> {
        sqlx::query("UPDATE agents SET reputation = $2 WHERE id = $1")
            .bind(agent_id)
            .bind(reputation)
            .execute(&self.pool)
            .await
            .map_err(|e| format!("Failed to update reputation: {}", e))?;

        Ok(())
    }

    pub async fn load_all(&self) -> Result<Vec<Agent>, String> {
        let rows = with_read_retry("load agents", || {
            sqlx::query(
                r#"
                SELECT id, name, description, reputation, is_claimed,
                       api_key_salt, api_key_hash, created_at
                FROM agents
                ORDER BY id
                "#,
            )
            .fetch_all(&self.pool)
        })
        .await?;

        let agents = rows
            .into_iter()
            .map(|row| {
                let created_at: DateTime<Utc> = row.get("created_at");
                Agent {
                    id: row.get("id"),
                    name: row.get("name"),
                    description: row.get("description"),
                    reputation: row.get("reputation"),
                    is_claimed: row.get("is_claimed"),
                    created_at,
                    credential: CredentialRecord {
                        salt: row.get("api_key_salt"),
                        key_hash: row.get("api_key_hash"),
                    },
                }
            })
            .collect();

        Ok(agents)
    }
}
