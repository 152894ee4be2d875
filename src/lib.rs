// todostore - single-user to-do list core: ordered task store + view filters + blob persistence

pub mod filter;
pub mod models;
pub mod persist;
pub mod store;

// Re-export main types for convenience
pub use filter::{CategoryFilter, StatusFilter, visible_tasks};
pub use models::{Category, Task, TaskId};
pub use persist::{FileAdapter, MemoryAdapter, PersistenceAdapter};
pub use store::TaskStore;
