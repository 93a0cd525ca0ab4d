#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod progress;
pub mod stats;
pub mod time;

pub use error::{IdError, PlanError, PlanProgressError};
pub use time::Clock;
