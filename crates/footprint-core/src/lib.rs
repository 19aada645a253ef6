//! Carbon footprint calculation and reconciliation engine.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! classifies raw activity data, prices it against an injected emission
//! factor table, reconciles automated entries with manual ones, aggregates
//! monthly facility records, and builds company footprint summaries.
//! Persistence is reached only through the [`store::FootprintStore`] trait.

pub mod aggregate;
pub mod calculate;
pub mod category;
pub mod classify;
pub mod company;
pub mod engine;
pub mod entry;
pub mod error;
pub mod facility;
pub mod factor;
pub mod operations;
pub mod reconcile;
pub mod store;
pub mod summary;

pub use engine::{EngineConfig, EngineError, FootprintEngine};
pub use error::{Error, Result};
