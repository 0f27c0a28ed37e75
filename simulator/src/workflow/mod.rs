pub mod config;
pub mod drive;
pub mod runner;
