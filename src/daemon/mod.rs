pub mod api;
pub mod core;
pub mod cpu;
pub mod installer;
pub mod logs;
pub mod monitor;
pub mod osproc;
pub mod persistence;
pub mod program;
pub mod registry;
pub mod signal;
pub mod spawner;
pub mod state;
pub mod supervisor;
pub mod time;

pub use self::core::Core;
