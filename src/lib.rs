mod error;
mod parameters;
mod review;
mod scheduler;
mod store;
#[cfg(test)]
mod test_helpers;

pub use error::{Result, SchedulerError};
pub use parameters::{DEFAULT_PARAMETERS, Parameters};
pub use review::{CardState, Rating, SEED_DIFFICULTY, SEED_STABILITY, Status};
pub use scheduler::{
    DEFAULT_DESIRED_RETENTION, ItemState, MemoryState, NextStates, Scheduler,
};
pub use store::{ItemStore, MemoryStore, schedule_review};
