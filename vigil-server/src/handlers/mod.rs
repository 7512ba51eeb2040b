pub mod accounts;
pub mod admin;
pub mod check;
pub mod forms;
pub mod scan;
