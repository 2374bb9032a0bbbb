//! Model persistence.
//!
//! - **CheckpointStore**: trait the trainer saves champions through
//! - **FileCheckpointStore**: numbered files, atomic publish
//! - **MemoryCheckpointStore**: encoded bytes in memory, for tests and
//!   short runs
//! - `save_model` / `load_model`: single-file helpers

pub mod store;

pub use store::{
    decode_model, encode_model, load_model, save_model, CheckpointHandle, CheckpointStore,
    FileCheckpointStore, MemoryCheckpointStore, CHECKPOINT_MAGIC, FORMAT_VERSION,
};
