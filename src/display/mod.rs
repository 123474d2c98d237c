//! Terminal display utilities.

pub mod progress;

pub use progress::{ProgressReporter, create_spinner};
