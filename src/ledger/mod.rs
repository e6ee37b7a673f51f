//! Vouch Ledger
//!
//! Append-mostly store of directed attestations between agents.
//!
//! ## Supersession Model
//!
//! A new vouch A→B supersedes the previous A→B vouch for scoring purposes;
//! only the latest per ordered pair is *active*. Superseded vouches are
//! never deleted: they stay listed (audit trail) and remain flaggable.
//!
//! ## Concurrency
//!
//! Appends for the same (from, to) pair linearize under that pair's index
//! entry guard; distinct pairs proceed in parallel. Duplicate-flag
//! rejection is enforced atomically through the flag index entry guard,
//! never read-then-write.

mod store;
mod vouch;

pub use store::VouchLedger;
pub use vouch::{Flag, Vouch, VouchDirection, MAX_SCORE, MIN_SCORE};
