//! In-process adapters, used when no database or Redis is configured and by
//! tests.

mod accounts;
mod count_cache;
mod verdicts;

pub use accounts::InMemoryAccountDirectory;
pub use count_cache::InMemoryCountCache;
pub use verdicts::InMemoryVerdictRepository;
