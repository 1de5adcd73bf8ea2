//! ItemStream - single-table item store and change-stream reactor
//!
//! Two halves share one table:
//! - `store` / `api`: item CRUD over a key-value table with one
//!   secondary index, keyed `ITEM#{id}` / `METADATA`
//! - `stream`: decodes the table's change feed, diffs before/after images
//!   and dispatches per-entity-type side effects with per-record failure
//!   isolation

pub mod api;
pub mod codec;
pub mod config;
pub mod metrics;
pub mod storage;
pub mod store;
pub mod stream;
pub mod utils;
