pub mod cli;
pub mod config;
pub mod job;
pub mod logging;
pub mod message;
pub mod options;
pub mod returner;
pub mod slack;
