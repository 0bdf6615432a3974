//! Deterministic stand-ins for the embedding and generation models

mod embedder;

pub use embedder::BagOfWordsEmbedder;
pub use fixtures::TestDataFactory;
pub use generator::ScriptedGenerator;
