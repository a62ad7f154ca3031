//! Idle detection: the sampler seam and its platform-specific implementations.

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "windows")]
mod windows;
#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
mod unsupported;

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
mod session;
pub mod tracker;

use std::time::Duration;
use thiserror::Error;

/// Failure to read the time since last operator input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SampleError {
    /// The platform facility could not be reached at all.
    #[error("idle source unavailable: {0}")]
    Unavailable(String),
    /// A single query against an available facility failed.
    #[error("idle query failed: {0}")]
    Query(String),
}

/// Source of the elapsed time since the last keyboard or mouse input.
pub trait IdleSampler {
    /// Query the host for the current idle duration.
    fn sample(&self) -> Result<Duration, SampleError>;
}

#[cfg(target_os = "macos")]
pub use macos::PlatformSampler;
#[cfg(target_os = "linux")]
pub use linux::PlatformSampler;
#[cfg(target_os = "windows")]
pub use windows::PlatformSampler;
#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
pub use unsupported::PlatformSampler;
