#![allow(dead_code)]

#[macro_use]
extern crate rocket;

pub mod client;
pub mod config;
pub mod daemon;
pub mod dto;
pub mod error;
pub mod path;
pub mod process;
