//! Agent record

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::identity::CredentialRecord;

/// A registered agent.
///
/// `reputation` is a derived cache maintained by the scorer; the vouch
/// ledger is the source of truth. The credential record never serializes.
#[derive(Debug, Clone, Serialize)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub reputation: f64,
    pub is_claimed: bool,
    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing)]
    pub credential: CredentialRecord,
}

impl Agent {
    pub fn new(
        id: i64,
        name: String,
        description: String,
        credential: CredentialRecord,
    ) -> Self {
        Self {
            id,
            name,
            description,
            reputation: 0.0,
            is_claimed: false,
            created_at: Utc::now(),
            credential,
        }
    }
}
