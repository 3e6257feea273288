pub mod client;
pub mod estimator;
pub mod pipeline;
pub mod retry;

pub use client::{BackgroundRemover, HttpRemover};
pub use estimator::{EstimatorSettings, ProgressEstimator};
pub use pipeline::SubmissionPipeline;
pub use retry::{RetryDecision, RetryPolicy};
