pub mod base;
pub mod limits;
pub mod logging;
pub mod scheduler;

pub use base::*;
pub use limits::*;
pub use logging::*;
pub use scheduler::*;
