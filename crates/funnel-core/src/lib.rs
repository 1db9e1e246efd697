pub mod delay;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod pool;
pub mod throttle;
pub mod traits;


pub use delay::{DelayAlgorithm, DelayConfig, calculate_delays};
pub use dispatch::{DispatchConfig, DispatchSummary, Dispatcher, TracingReporter};
pub use error::AppError;
pub use models::compute_hash;
pub use pool::WorkerPool;
pub use throttle::DelayedFetcher;
pub use traits::{Fetcher, ItemFetcher, Locate, Parser, WorkItem};
