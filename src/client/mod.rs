pub mod cli;
pub mod commands;
pub mod config;
pub mod emoji;
pub mod progress;
pub mod request;
#[macro_use]
pub mod terminal;
