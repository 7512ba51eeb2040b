//! Repository ports (interfaces) the detector talks to.
//! Implementations live under `database::infrastructure`.

pub mod accounts;
pub mod count_cache;
pub mod verdicts;
