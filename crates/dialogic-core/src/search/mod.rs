//! Search Module
//!
//! Exact nearest-neighbor search for anchor classification:
//! - Flat (brute-force) index under squared Euclidean distance
//! - Binary vector blocks shared by the index and embedding artifacts

mod codec;
mod flat;

pub use codec::{CodecError, VectorBlock, BLOCK_VERSION};

pub use flat::{
    FlatIndex, FlatIndexStats, Neighbor, VectorSearchError, INDEX_MAGIC, METRIC_L2_SQUARED,
};
