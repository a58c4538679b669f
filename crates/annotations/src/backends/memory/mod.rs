//! In-memory backends.
//!
//! These implement every collaborator trait without external state. They are
//! the default for tests and for the CLI's `--backend memory`.

mod cache;
mod counter;
mod store;

pub use cache::{MemoryCache, NoopCache};
pub use counter::MemoryVersionCounter;
pub use store::MemoryStore;
