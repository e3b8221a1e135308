#![forbid(unsafe_code)]
#![warn(clippy::all)]

//! The utility registry: verifies claim proofs against a published snapshot
//! root and records registrations, entrances and votes.

pub mod poll;
pub mod registry;
pub mod store;
pub mod types;

pub use poll::{wait_for, RetryPolicy};
pub use registry::ClaimRegistry;
pub use store::{MemoryStore, RegistryStore, SledStore};
pub use types::{ClaimMutation, CommitmentStatus, CreateUtility, UtilityKind, UtilityRecord};

#[cfg(test)]
mod tests;
