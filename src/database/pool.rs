//! Database connection pool using sqlx

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, warn};

use crate::database::agents::AgentRepository;
use crate::database::vouches::VouchRepository;

/// Attempts for read-path queries before surfacing the failure.
const READ_ATTEMPTS: u32 = 3;
const READ_RETRY_BACKOFF: Duration = Duration::from_millis(200);

pub struct DatabasePool {
    pool: PgPool,
    agents: AgentRepository,
    vouches: VouchRepository,
}

impl DatabasePool {
    pub async fn connect(connection_string: &str) -> Result<Self, String> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(connection_string)
            .await
            .map_err(|e| format!("Failed to connect to PostgreSQL: {}", e))?;

        info!("Connected to PostgreSQL");

        let agents = AgentRepository::new(pool.clone());
        let vouches = VouchRepository::new(pool.clone());

        Ok(Self {
            pool,
            agents,
            vouches,
        })
    }

    pub async fn init_schema(&self) -> Result<(), String> {
        info!("Initializing database schema...");
        self.agents.init_schema().await?;
        self.vouches.init_schema().await?;
        info!("Database schema initialized");
        Ok(())
    }

    pub fn agents(&self) -> &AgentRepository {
        &self.agents
    }

    pub fn vouches(&self) -> &VouchRepository {
        &self.vouches
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Run a read-path query with bounded retries. Only reads go through
/// here; writes must not be replayed implicitly.
pub(crate) async fn with_read_retry<T, F, Fut>(label: &str, mut op: F) -> Result<T, String>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    let mut last_err = None;
    for attempt in 1..=READ_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(query = label, attempt, error = %err, "Read query failed");
                last_err = Some(err);
                if attempt < READ_ATTEMPTS {
                    tokio::time::sleep(READ_RETRY_BACKOFF).await;
                }
            }
        }
    }

    Err(format!(
        "{} failed after {} attempts: {}",
        label,
        READ_ATTEMPTS,
        last_err.map(|e| e.to_string()).unwrap_or_default()
    ))
}
