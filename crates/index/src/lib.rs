//! Spec indexing and resolution for specdeck
//!
//! The pipeline: the loader reads the portal configuration and builds the
//! host [`Registry`](specdeck_core::Registry); each spec is sanitized,
//! its operations extracted, and written into a disk-backed tantivy shard
//! keyed by content hash; the shards federate behind an [`Alias`] that
//! serves ranked search and method+URL resolution.

mod alias;
mod extract;
mod loader;
mod resolve;
mod sanitize;
mod shard;
#[cfg(test)]
mod testutil;

pub use alias::*;
pub use extract::*;
pub use loader::*;
pub use resolve::*;
pub use sanitize::*;
pub use shard::*;
