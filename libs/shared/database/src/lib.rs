pub mod memory;
pub mod postgrest;
pub mod store;

pub use memory::InMemoryStore;
pub use postgrest::PostgrestStore;
pub use store::{SchedulingStore, StoreError};
