//! Timestamp source used by the sonar driver.
use embedded_time::duration::{Microseconds, Milliseconds};

/// Monotonic time source.
///
/// Both readings count from the same (arbitrary) epoch and wrap at
/// `u32::MAX`. Implementations must be callable from interrupt context.
pub trait Clock {
    /// Milliseconds since the epoch.
    fn millis(&self) -> Milliseconds<u32>;

    /// Microseconds since the epoch.
    fn micros(&self) -> Microseconds<u32>;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn millis(&self) -> Milliseconds<u32> {
        (**self).millis()
    }

    fn micros(&self) -> Microseconds<u32> {
        (**self).micros()
    }
}
