//! Implementations behind each CLI subcommand.

pub mod audit;
pub mod skills;
pub mod visual;
