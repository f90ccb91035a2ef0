//! Queue Module
//!
//! FIFO task queue that caps how many upstream operations run at once.

mod stats;
mod task_queue;

pub use stats::QueueStats;
pub use task_queue::{ConcurrencyQueue, QueueHandle};

/// Default number of operations allowed to run concurrently
pub const DEFAULT_CAPACITY: usize = 3;
