pub mod config;
pub mod exchange;
pub mod fixtures;
pub mod outcome;
pub mod probes;
pub mod report;
pub mod runner;
pub mod scoring;
pub mod stream;
