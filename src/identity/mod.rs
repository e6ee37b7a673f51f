//! Identity & Credential Store
//!
//! Manages agent records and API-key issuance/verification.
//!
//! ## Credential Model
//!
//! - A credential is minted exactly once, at registration, and returned in
//!   plaintext exactly once. Only a salted SHA-256 hash is retained.
//! - Keys carry the agent id (`ethos_{id}_{secret}`) so verification is a
//!   single record lookup followed by a constant-time hash comparison.
//! - Every authentication failure collapses to the same `Unauthorized`
//!   error: malformed key, unknown agent, and hash mismatch are
//!   indistinguishable to the caller.

mod agent;
mod credential;
mod store;

pub use agent::Agent;
pub use credential::{mint_api_key, verify_api_key, CredentialRecord};
pub use store::IdentityStore;
