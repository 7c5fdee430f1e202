//! Test doubles for the embedded-hal traits and the clock.
use crate::time::Clock;
use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_time::duration::{Microseconds, Milliseconds};
use std::rc::Rc;

/// Clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock {
    ms: Cell<u32>,
    us: Cell<u32>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to `ms` milliseconds.
    pub fn at_ms(&self, ms: u32) {
        self.ms.set(ms);
        self.us.set(ms.wrapping_mul(1_000));
    }

    /// Jump to `us` microseconds.
    pub fn at_us(&self, us: u32) {
        self.ms.set(us / 1_000);
        self.us.set(us);
    }
}

impl Clock for ManualClock {
    fn millis(&self) -> Milliseconds<u32> {
        Milliseconds(self.ms.get())
    }

    fn micros(&self) -> Microseconds<u32> {
        Microseconds(self.us.get())
    }
}

/// Output pin recording every level it is driven to.
#[derive(Clone, Default)]
pub struct RecordingPin {
    levels: Rc<RefCell<Vec<bool>>>,
}

impl RecordingPin {
    pub fn levels(&self) -> Vec<bool> {
        self.levels.borrow().clone()
    }
}

impl OutputPin for RecordingPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

/// Delay recording requested durations without waiting.
#[derive(Clone, Default)]
pub struct RecordingDelay {
    calls: Rc<RefCell<Vec<u32>>>,
}

impl RecordingDelay {
    pub fn calls(&self) -> Vec<u32> {
        self.calls.borrow().clone()
    }
}

impl DelayUs<u32> for RecordingDelay {
    fn delay_us(&mut self, us: u32) {
        self.calls.borrow_mut().push(us);
    }
}

/// Input pin whose level is set by the test.
#[derive(Default)]
pub struct LevelPin {
    high: Cell<bool>,
}

impl LevelPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, high: bool) {
        self.high.set(high);
    }
}

impl InputPin for LevelPin {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.high.get())
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.high.get())
    }
}

/// Input pin whose reads always fail.
pub struct FaultyPin;

impl InputPin for FaultyPin {
    type Error = ();

    fn is_high(&self) -> Result<bool, Self::Error> {
        Err(())
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Err(())
    }
}
