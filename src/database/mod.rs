//! PostgreSQL persistence
//!
//! The in-memory stores are authoritative at runtime; this layer is a
//! write-through journal reloaded at boot. Reads retry a bounded number
//! of times; writes surface their first failure (resubmission is the
//! caller's decision).

mod agents;
mod pool;
mod vouches;

pub use agents::AgentRepository;
pub use pool::DatabasePool;
pub use vouches::VouchRepository;
