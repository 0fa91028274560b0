//! Session storage abstractions.

mod file;
mod memory;
mod traits;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use traits::{
    DOCUMENT_KEY, PARTICIPANT_KEY, POST_A_ORDER_KEY, SessionStorage, SharedStorage,
};
