pub mod common;
pub mod configs;
pub mod protocol;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use common::{ChatId, Epoch, SchedulerError, SchedulerResult};
pub use scheduler::Scheduler;
