pub mod artifact;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod ledger;
pub mod orchestration;
