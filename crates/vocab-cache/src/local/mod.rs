//! Local persisted key/value stores.

pub mod file;
pub mod memory;

pub use file::FileLocalStore;
pub use memory::MemoryLocalStore;
