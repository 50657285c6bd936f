pub mod chroma;
pub mod memory;

pub use chroma::{ChromaConfig, ChromaStore};
pub use memory::MemoryStore;
