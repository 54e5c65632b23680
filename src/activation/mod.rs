pub mod job;

pub use job::{
    ActivationRetryJob, DEFAULT_RETRY_INTERVAL, DEFAULT_TIMEOUT, JobOutcome, RetryAction,
    RetrySettings,
};
