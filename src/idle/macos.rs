//! Idle sampling for macOS using IOKit HIDIdleTime.

use core_foundation::base::TCFType;
use core_foundation::number::CFNumber;
use core_foundation::string::CFString;
use std::time::Duration;
use tracing::{info, warn};

use super::{IdleSampler, SampleError};

#[link(name = "IOKit", kind = "framework")]
extern "C" {
    fn IOServiceGetMatchingService(
        main_port: u32,
        matching: core_foundation::base::CFTypeRef,
    ) -> u32;
    fn IOServiceMatching(name: *const std::os::raw::c_char) -> core_foundation::base::CFTypeRef;
    fn IORegistryEntryCreateCFProperty(
        entry: u32,
        key: core_foundation::string::CFStringRef,
        allocator: core_foundation::base::CFAllocatorRef,
        options: u32,
    ) -> core_foundation::base::CFTypeRef;
    fn IOObjectRelease(object: u32) -> i32;
}

/// Idle sampler reading `HIDIdleTime` from the IOHIDSystem registry entry.
pub struct PlatformSampler;

impl PlatformSampler {
    /// Create the sampler. IOKit is queried afresh on every sample, so a
    /// failed first read here is only reported.
    pub fn new() -> Result<Self, SampleError> {
        let sampler = Self;
        match sampler.sample() {
            Ok(_) => info!("Using IOKit HIDIdleTime for idle sampling"),
            Err(e) => warn!("IOKit idle source not available yet, will retry: {}", e),
        }
        Ok(sampler)
    }
}

impl IdleSampler for PlatformSampler {
    fn sample(&self) -> Result<Duration, SampleError> {
        let service_name = std::ffi::CString::new("IOHIDSystem")
            .map_err(|e| SampleError::Query(e.to_string()))?;

        // SAFETY: every IOKit object obtained here is released before returning,
        // and the property is wrapped under the create rule so CF releases it.
        unsafe {
            let matching = IOServiceMatching(service_name.as_ptr());
            if matching.is_null() {
                return Err(SampleError::Query("IOServiceMatching returned null".into()));
            }

            // IOServiceGetMatchingService consumes the matching dictionary.
            let service = IOServiceGetMatchingService(0, matching);
            if service == 0 {
                return Err(SampleError::Query("IOHIDSystem service not found".into()));
            }

            let key = CFString::new("HIDIdleTime");
            let property = IORegistryEntryCreateCFProperty(
                service,
                key.as_concrete_TypeRef(),
                std::ptr::null(),
                0,
            );

            IOObjectRelease(service);

            if property.is_null() {
                return Err(SampleError::Query("HIDIdleTime property missing".into()));
            }

            // The property is a CFNumber containing nanoseconds
            let cf_number: CFNumber = CFNumber::wrap_under_create_rule(property as core_foundation::number::CFNumberRef);
            let nanoseconds = cf_number
                .to_i64()
                .ok_or_else(|| SampleError::Query("HIDIdleTime is not an integer".into()))?;

            Ok(Duration::from_nanos(nanoseconds.max(0) as u64))
        }
    }
}
