//! Key-value store abstraction for the JamTalk vault.
//!
//! This module provides a trait-based interface over local databases with a
//! fixed set of named buckets, plus a registry for resolving a backend by
//! name and configuration.
//!
//! # Design Principles
//! - Encryption-unaware: stores whatever JSON envelope it is given
//! - Async operations: blocking database work runs off the executor
//! - Single-operation transactions: no cross-key or cross-bucket atomicity

pub mod memory;
pub mod provider;
pub mod registry;
pub mod sqlite;

pub use memory::MemoryStore;
pub use provider::KeyValueStore;
pub use registry::{create_default_registry, StoreFactory, StoreRegistry};
pub use sqlite::SqliteStore;
