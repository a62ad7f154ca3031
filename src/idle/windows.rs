//! Idle sampling for Windows using the GetLastInputInfo Win32 API.

use std::time::Duration;
use tracing::info;
use windows::Win32::System::SystemInformation::GetTickCount;
use windows::Win32::UI::Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO};

use super::{IdleSampler, SampleError};

/// Idle sampler backed by `GetLastInputInfo`.
pub struct PlatformSampler;

impl PlatformSampler {
    /// Create the sampler; `GetLastInputInfo` needs no setup.
    pub fn new() -> Result<Self, SampleError> {
        info!("Using Windows GetLastInputInfo for idle sampling");
        Ok(Self)
    }
}

impl IdleSampler for PlatformSampler {
    fn sample(&self) -> Result<Duration, SampleError> {
        let mut last_input = LASTINPUTINFO {
            cbSize: std::mem::size_of::<LASTINPUTINFO>() as u32,
            dwTime: 0,
        };

        // SAFETY: `last_input` is a properly sized, initialised LASTINPUTINFO.
        let ok = unsafe { GetLastInputInfo(&mut last_input) }.as_bool();
        if !ok {
            return Err(SampleError::Query(
                std::io::Error::last_os_error().to_string(),
            ));
        }

        // Tick count wraps every ~49.7 days; wrapping_sub keeps the delta right.
        // SAFETY: GetTickCount takes no arguments and cannot fail.
        let current_tick = unsafe { GetTickCount() };
        let idle_ms = current_tick.wrapping_sub(last_input.dwTime);
        Ok(Duration::from_millis(u64::from(idle_ms)))
    }
}
