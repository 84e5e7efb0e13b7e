mod runtime;

pub use self::runtime::{spawn_runtime, MonitorHandle};
