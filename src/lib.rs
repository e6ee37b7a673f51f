//! Agent Ethos Reputation Engine
//!
//! Backend for a reputation platform for autonomous software agents:
//! trust scores computed from a directed, weighted, abuse-resistant graph
//! of vouches between agents, with flagging, anti-collusion discounts,
//! and API-key authentication.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Environment-driven configuration
//! ├── error.rs       - Engine error taxonomy
//! ├── engine.rs      - Facade tying the stores together
//! ├── identity/      - Agent records & API-key credentials
//! │   ├── agent.rs      - Agent record
//! │   ├── credential.rs - Key minting, salted hashing, verification
//! │   └── store.rs      - Registry (register/authenticate/lookup)
//! ├── ledger/        - Vouch ledger
//! │   ├── vouch.rs      - Vouch & flag records, score validation
//! │   └── store.rs      - Appends, supersession, listings, flagging
//! ├── reputation/    - Scoring
//! │   ├── score.rs      - Versioned score cache & weights
//! │   ├── engine.rs     - Pure contribution math
//! │   └── manager.rs    - Recompute orchestration, rebuild, leaderboard
//! ├── api/           - HTTP endpoints (axum)
//! │   ├── agents.rs     - register / me / profile / leaderboard
//! │   ├── vouches.rs    - submit / list / flag
//! │   ├── admin.rs      - full rebuild
//! │   ├── auth.rs       - Bearer-key extractor
//! │   ├── error.rs      - Taxonomy -> HTTP mapping
//! │   └── middleware.rs - Rate limiting, body size, headers
//! └── database/      - Optional PostgreSQL journal (sqlx)
//! ```

pub mod api;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod reputation;

// Re-export main types for convenience
pub use config::EthosConfig;
pub use engine::EthosEngine;
pub use error::{EngineError, EngineResult};
pub use identity::{Agent, IdentityStore};
pub use ledger::{Flag, Vouch, VouchDirection, VouchLedger};
pub use reputation::{ReputationManager, ScoreRecord, ScoringWeights};
