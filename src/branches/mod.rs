pub mod classify;
pub mod discovery;
pub mod types;
