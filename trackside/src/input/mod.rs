//! Text input: scenario scripts for the command line driver.

pub mod scenario;
