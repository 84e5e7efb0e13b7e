mod add;
mod lifecycle;
mod logs;
mod ps;
mod upload;

pub use self::add::*;
pub use self::lifecycle::*;
pub use self::logs::*;
pub use self::ps::*;
pub use self::upload::*;
