//! Fallback for targets without an idle query.

use std::time::Duration;

use super::{IdleSampler, SampleError};

/// Sampler for platforms with no known idle source.
pub struct PlatformSampler;

impl PlatformSampler {
    /// Always fails: there is nothing to sample on this target.
    pub fn new() -> Result<Self, SampleError> {
        Err(SampleError::Unavailable(format!(
            "idle sampling is not supported on {}",
            std::env::consts::OS
        )))
    }
}

impl IdleSampler for PlatformSampler {
    fn sample(&self) -> Result<Duration, SampleError> {
        Err(SampleError::Unavailable(format!(
            "idle sampling is not supported on {}",
            std::env::consts::OS
        )))
    }
}
