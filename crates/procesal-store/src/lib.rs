//! Storage layer: the local corpus slot and the state holder that keeps it in
//! step with memory.

mod error;
pub use error::StoreError;

mod slot;
pub use slot::{CorpusStore, RETENTION, SLOT_NAME};

mod state;
pub use state::CorpusState;
