mod service;

pub use service::{CleanupService, SweepError, SweepReport};
