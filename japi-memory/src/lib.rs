//! In-memory storage adapter for `japi`.
//!
//! Provides [`MemoryStore`], an [`Adapter`](japi_core::adapter::Adapter)
//! implementation backed by per-type in-process collections. Well suited to
//! tests, prototypes, and fixture-driven servers; data does not survive the
//! process.

mod evaluator;
mod store;

pub use store::{MemoryStore, MemoryStoreBuilder};
