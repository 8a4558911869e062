//! CLI subcommand implementations.

pub mod capabilities;
pub mod doctor;
pub mod gateway;
pub mod onboard;
pub mod run;
