//! Echo pulse capture.
//!
//! [`EchoCapture`] runs in the echo pin interrupt and times the width of the
//! sensor's response pulse. Completed measurements are handed to the
//! scheduler side through an [`EchoSlot`].
use crate::time::Clock;
use core::sync::atomic::{fence, AtomicU32, Ordering};
use embedded_hal::digital::v2::InputPin;
use embedded_time::duration::{Microseconds, Milliseconds};

/// Width of one echo pulse, and when it ended.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseMeasurement {
    /// Width of the echo pulse, in microseconds.
    pub travel_time_us: u32,
    /// Time at which the falling edge was seen, in milliseconds.
    pub received_at_ms: u32,
}

impl PulseMeasurement {
    /// Width of the echo pulse.
    pub fn travel_time(&self) -> Microseconds<u32> {
        Microseconds(self.travel_time_us)
    }

    /// Time at which the falling edge was seen.
    pub fn received_at(&self) -> Milliseconds<u32> {
        Milliseconds(self.received_at_ms)
    }
}

/// Latest [`PulseMeasurement`], shared between the echo interrupt and readers.
///
/// Both words are published together under a sequence counter: the writer
/// makes the counter odd, stores the pair, then makes it even again. Readers
/// retry until they see the same even counter on both sides of their loads,
/// so a travel time is never paired with the receipt time of another pulse.
///
/// There must be a single writer, the [`EchoCapture`] bound to the slot.
/// The writer never waits on readers.
pub struct EchoSlot {
    /// Odd while a publish is in progress.
    seq: AtomicU32,
    travel_time_us: AtomicU32,
    received_at_ms: AtomicU32,
}

impl EchoSlot {
    /// Create an empty slot.
    ///
    /// An empty slot reads as a zero-width pulse received at time zero, which
    /// is never fresh.
    pub const fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            travel_time_us: AtomicU32::new(0),
            received_at_ms: AtomicU32::new(0),
        }
    }

    /// Replace the stored measurement.
    fn publish(&self, measurement: PulseMeasurement) {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        self.travel_time_us
            .store(measurement.travel_time_us, Ordering::Relaxed);
        self.received_at_ms
            .store(measurement.received_at_ms, Ordering::Relaxed);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Read the stored measurement as one consistent pair.
    pub fn snapshot(&self) -> PulseMeasurement {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 0 {
                let travel_time_us = self.travel_time_us.load(Ordering::Relaxed);
                let received_at_ms = self.received_at_ms.load(Ordering::Relaxed);
                fence(Ordering::Acquire);

                if self.seq.load(Ordering::Relaxed) == before {
                    return PulseMeasurement {
                        travel_time_us,
                        received_at_ms,
                    };
                }
            }
            core::hint::spin_loop();
        }
    }
}

impl Default for EchoSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Transition seen on the echo line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Echo line went high: the pulse started.
    Rising,
    /// Echo line went low: the pulse ended.
    Falling,
}

/// Edge tracking state.
enum EdgeState {
    /// No rising edge is waiting for its falling edge.
    Idle,
    /// After a rising edge has been detected on the echo pin.
    RisingSeen {
        /// Time at which the rising edge was detected on the pin.
        rise: Microseconds<u32>,
    },
}

/// Echo pin interrupt handler state.
///
/// `CLK`: time source, read from interrupt context.
pub struct EchoCapture<'a, CLK> {
    clock: CLK,
    /// Where completed measurements are published.
    slot: &'a EchoSlot,
    state: EdgeState,
}

impl<'a, CLK: Clock> EchoCapture<'a, CLK> {
    /// Create a new `EchoCapture` publishing into `slot`.
    pub fn new(clock: CLK, slot: &'a EchoSlot) -> Self {
        Self {
            clock,
            slot,
            state: EdgeState::Idle,
        }
    }

    /// Handle an interrupt on an echo line configured to fire on both edges.
    ///
    /// The line level after the transition tells which edge it was. If the
    /// pin cannot be read the interrupt is dropped.
    pub fn handle_interrupt<ECHO: InputPin>(&mut self, echo: &ECHO) {
        match echo.is_high() {
            Ok(true) => self.on_edge(Edge::Rising),
            Ok(false) => self.on_edge(Edge::Falling),
            Err(_) => warn!("sonar: echo pin read failed, edge dropped"),
        }
    }

    /// Process one edge on the echo line.
    ///
    /// A falling edge publishes the pulse width only if it is positive and a
    /// rising edge was pending. Anything else is discarded.
    pub fn on_edge(&mut self, edge: Edge) {
        let now = self.clock.micros();

        match edge {
            Edge::Rising => {
                // A second rising edge before the falling edge restarts the pulse.
                self.state = EdgeState::RisingSeen { rise: now };
            }
            Edge::Falling => match core::mem::replace(&mut self.state, EdgeState::Idle) {
                EdgeState::RisingSeen { rise } if now.0 > rise.0 => {
                    let measurement = PulseMeasurement {
                        travel_time_us: now.0 - rise.0,
                        received_at_ms: self.clock.millis().0,
                    };
                    self.slot.publish(measurement);
                    trace!(
                        "sonar: echo {=u32} us at {=u32} ms",
                        measurement.travel_time_us,
                        measurement.received_at_ms
                    );
                }
                EdgeState::RisingSeen { .. } => {
                    trace!("sonar: non-positive echo width discarded");
                }
                EdgeState::Idle => {
                    trace!("sonar: falling edge without rising edge discarded");
                }
            },
        }
    }
}
