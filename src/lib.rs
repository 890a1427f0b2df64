//! Report Runner - spawn commands and collect the structured reports they
//! print between delimiter tokens.

pub mod config;
pub mod display;
pub mod factory;
pub mod pool;
pub mod process;
pub mod report;
pub mod runner;
