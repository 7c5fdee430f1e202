//! Driver for the HC-SR04 ultrasonic sensor.
//!
//! The sensor is asked for a measurement with a short pulse on its trigger
//! input. It answers by holding its echo output high for as long as the sound
//! took to travel to the target and back. The echo width is timed in the
//! echo pin interrupt by [`EchoCapture`]; [`Sonar`] fires the trigger and turns
//! the latest width into a [`Reading`].
use crate::rangefinder::{self, Rangefinder, RangefinderInfo};
use crate::time::Clock;
use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::OutputPin;
use embedded_time::duration::{Microseconds, Milliseconds};

mod echo;

pub use echo::{EchoCapture, EchoSlot, Edge, PulseMeasurement};

/// Maximum range of the sensor, in centimeters.
///
/// From the HC-SR04 datasheet.
pub const MAX_RANGE_CM: u32 = 400;

/// Minimum time between two trigger pulses.
///
/// Firing again before the previous echo has resolved makes the two pulses
/// overlap. This is also how long after a trigger we wait for an echo before
/// declaring the sensor failed.
pub const MIN_FIRING_INTERVAL: Milliseconds<u32> = Milliseconds(60);

/// Width of the trigger pulse.
///
/// The datasheet asks for at least 10us.
pub const TRIGGER_WIDTH: Microseconds<u32> = Microseconds(11);

/// Echo width per centimeter of range.
///
/// 340 m/s is 29.4us per centimeter. The echo covers the round trip, so
/// 58.8us, rounded to 59.
pub const US_PER_CM: u32 = 59;

/// Suggested interval between two calls to [`Sonar::start_reading`].
pub const UPDATE_INTERVAL: Milliseconds<u32> = Milliseconds(100);

/// Detection cone recommended by the datasheet, in tenths of a degree.
pub const DETECTION_CONE_DECIDEGREES: u16 = 300;

/// Detection cone that works in practice, in tenths of a degree.
pub const DETECTION_CONE_EXTENDED_DECIDEGREES: u16 = 450;

/// Electrical level that asserts the trigger input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerPolarity {
    /// Trigger is active-high.
    Normal,
    /// Trigger is active-low.
    Inverted,
}

impl Default for TriggerPolarity {
    /// `Inverted` when built with the `trigger-inverted` feature.
    fn default() -> Self {
        if cfg!(feature = "trigger-inverted") {
            TriggerPolarity::Inverted
        } else {
            TriggerPolarity::Normal
        }
    }
}

/// Driver configuration.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Trigger pin polarity.
    pub polarity: TriggerPolarity,
}

/// Result of a range reading.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reading {
    /// Distance to the target, at most [`MAX_RANGE_CM`].
    Centimeters(u32),
    /// An echo was received but it is beyond the sensor's rated range.
    OutOfRange,
    /// No echo was received in time after a trigger.
    HardwareFailure,
}

impl Reading {
    /// Convert an echo width to a reading.
    pub fn from_travel_time(travel_time: Microseconds<u32>) -> Self {
        let distance = travel_time.0 / US_PER_CM;
        if distance > MAX_RANGE_CM {
            Reading::OutOfRange
        } else {
            Reading::Centimeters(distance)
        }
    }

    /// Distance in centimeters, if this is a valid reading.
    pub fn centimeters(self) -> Option<u32> {
        match self {
            Reading::Centimeters(cm) => Some(cm),
            _ => None,
        }
    }

    /// Integer code used by the rangefinder interface.
    ///
    /// Centimeters are returned as-is, failures as negative codes.
    pub fn code(self) -> i32 {
        match self {
            // Never above `MAX_RANGE_CM`.
            Reading::Centimeters(cm) => cm as i32,
            Reading::OutOfRange => rangefinder::OUT_OF_RANGE,
            Reading::HardwareFailure => rangefinder::HARDWARE_FAILURE,
        }
    }
}

impl From<Reading> for i32 {
    fn from(reading: Reading) -> Self {
        reading.code()
    }
}

/// Driver structure.
///
/// `TRIG`: Trigger pin.
/// `DELAY`: Blocking delay used to time the trigger pulse.
/// `CLK`: Time source.
pub struct Sonar<'a, TRIG, DELAY, CLK> {
    /// Trigger pin.
    trig: TRIG,
    delay: DELAY,
    clock: CLK,
    /// Measurements published by the echo interrupt.
    echo: &'a EchoSlot,
    config: Config,
    /// Time at which the last trigger pulse was fired.
    last_fired_at: Milliseconds<u32>,
    /// Last reading handed out.
    last_known: Reading,
}

impl<'a, TRIG, DELAY, CLK> Sonar<'a, TRIG, DELAY, CLK>
where
    TRIG: OutputPin,
    DELAY: DelayUs<u32>,
    CLK: Clock,
{
    /// Create a new `Sonar` instance reading measurements from `echo`.
    ///
    /// The trigger pin is deasserted. Until the first echo arrives readings
    /// report [`Reading::HardwareFailure`].
    pub fn new(trig: TRIG, delay: DELAY, clock: CLK, echo: &'a EchoSlot, config: Config) -> Self {
        let mut sonar = Self {
            trig,
            delay,
            clock,
            echo,
            config,
            last_fired_at: Milliseconds(0),
            last_known: Reading::HardwareFailure,
        };
        sonar.set_trigger(false);
        sonar
    }

    /// Fire the trigger, unless the previous pulse was fired within
    /// [`MIN_FIRING_INTERVAL`].
    ///
    /// Called periodically by the scheduler. The echo is timed
    /// asynchronously by the echo interrupt.
    pub fn start_reading(&mut self) {
        let now = self.clock.millis();
        if now.0.wrapping_sub(self.last_fired_at.0) <= MIN_FIRING_INTERVAL.0 {
            return;
        }

        self.last_fired_at = now;
        self.set_trigger(true);
        self.delay.delay_us(TRIGGER_WIDTH.0);
        self.set_trigger(false);
        trace!("sonar: trigger at {=u32} ms", now.0);
    }

    /// Get the distance measured by the last echo.
    ///
    /// - An echo received after the last trigger gives a new reading.
    /// - Otherwise, within [`MIN_FIRING_INTERVAL`] of the trigger the sensor
    ///   may still answer, and the previous reading is returned.
    /// - Past that, the sensor is considered failed until an echo arrives.
    pub fn distance(&mut self) -> Reading {
        let now = self.clock.millis();
        let pulse = self.echo.snapshot();

        if pulse.received_at_ms > self.last_fired_at.0 {
            self.last_known = Reading::from_travel_time(pulse.travel_time());
        } else if now.0.wrapping_sub(self.last_fired_at.0) > MIN_FIRING_INTERVAL.0 {
            if self.last_known != Reading::HardwareFailure {
                warn!(
                    "sonar: no echo for trigger at {=u32} ms",
                    self.last_fired_at.0
                );
            }
            self.last_known = Reading::HardwareFailure;
        }

        self.last_known
    }

    /// Time at which the last trigger pulse was fired.
    pub fn last_fired_at(&self) -> Milliseconds<u32> {
        self.last_fired_at
    }

    /// Driver configuration.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Release the trigger pin, delay and clock.
    pub fn free(self) -> (TRIG, DELAY, CLK) {
        (self.trig, self.delay, self.clock)
    }

    /// Drive the trigger to its asserted or deasserted level.
    fn set_trigger(&mut self, asserted: bool) {
        let high = match self.config.polarity {
            TriggerPolarity::Normal => asserted,
            TriggerPolarity::Inverted => !asserted,
        };
        if high {
            self.trig.set_high().ok();
        } else {
            self.trig.set_low().ok();
        }
    }
}

impl<'a, TRIG, DELAY, CLK> Rangefinder for Sonar<'a, TRIG, DELAY, CLK>
where
    TRIG: OutputPin,
    DELAY: DelayUs<u32>,
    CLK: Clock,
{
    fn info(&self) -> RangefinderInfo {
        RangefinderInfo {
            delay_ms: UPDATE_INTERVAL.0,
            max_range_cm: MAX_RANGE_CM,
            detection_cone_decidegrees: DETECTION_CONE_DECIDEGREES,
            detection_cone_extended_decidegrees: DETECTION_CONE_EXTENDED_DECIDEGREES,
        }
    }

    fn init(&mut self) {}

    fn update(&mut self) {
        self.start_reading();
    }

    fn read(&mut self) -> i32 {
        self.distance().code()
    }
}
