mod accounts;
mod verdicts;

pub use accounts::PostgresAccountDirectory;
pub use verdicts::PostgresVerdictRepository;
