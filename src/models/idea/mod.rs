pub mod memory;
pub mod queries;
pub mod store;
pub mod types;
pub mod validate;

pub use memory::MemoryIdeaStore;
pub use queries::PgIdeaStore;
pub use store::IdeaStore;
pub use types::*;
