//! Storage ports and their adapters.

#[cfg(feature = "database")]
#[cfg_attr(docsrs, doc(cfg(feature = "database")))]
pub mod cache;
pub mod infrastructure;
pub mod ports;

pub use infrastructure::memory::{
    InMemoryAccountDirectory, InMemoryCountCache, InMemoryVerdictRepository,
};
#[cfg(feature = "database")]
pub use infrastructure::postgres::{PostgresAccountDirectory, PostgresVerdictRepository};
pub use ports::accounts::AccountDirectory;
pub use ports::count_cache::CountCache;
pub use ports::verdicts::{VerdictRecord, VerdictRepository};
