//! Rangefinder device interface.
//!
//! The flight controller side drives every rangefinder the same way: `update`
//! on a fixed cadence, `read` whenever it needs a range.

/// `read` code for an echo beyond the sensor's rated range.
pub const OUT_OF_RANGE: i32 = -1;

/// `read` code for a sensor that stopped answering.
pub const HARDWARE_FAILURE: i32 = -2;

/// Static description of a rangefinder.
///
/// The cone angles are informational only.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RangefinderInfo {
    /// Suggested interval between two calls to `update`, in milliseconds.
    pub delay_ms: u32,
    /// Maximum range, in centimeters.
    pub max_range_cm: u32,
    /// Detection cone, in tenths of a degree.
    pub detection_cone_decidegrees: u16,
    /// Wider detection cone usable in practice, in tenths of a degree.
    pub detection_cone_extended_decidegrees: u16,
}

/// Rangefinder device.
pub trait Rangefinder {
    /// Describe the device.
    fn info(&self) -> RangefinderInfo;

    /// Prepare the device for use.
    fn init(&mut self);

    /// Start a new measurement, if the device is ready for one.
    fn update(&mut self);

    /// Latest range in centimeters, or one of the negative codes above.
    fn read(&mut self) -> i32;
}
