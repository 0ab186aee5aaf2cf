pub mod answers;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod model;
pub mod postprocess;
pub mod prompt;
pub mod runner;
pub mod tasks;
pub mod util;
