//! Firmware library for an HC-SR04 ultrasonic rangefinder.
//!
//! The measurement cycle is split between two execution contexts:
//!
//! - the scheduler calls [`sonar::Sonar::start_reading`] periodically to fire
//!   the trigger pulse, and [`sonar::Sonar::distance`] whenever it wants the
//!   latest range;
//! - the echo pin interrupt feeds edges into [`sonar::EchoCapture`], which
//!   publishes pulse widths through a lock-free [`sonar::EchoSlot`].
//!
//! The `board` feature adds STM32F103 bring-up code and the RTIC binary.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod rangefinder;
pub mod sonar;
pub mod time;

#[cfg(feature = "board")]
pub mod board;

#[cfg(test)]
mod testing;

#[cfg(feature = "board")]
use defmt_rtt as _; // global logger
#[cfg(feature = "board")]
use panic_probe as _;

// same panicking *behavior* as `panic-probe` but doesn't print a panic message
// this prevents the panic message being printed *twice* when `defmt::panic` is invoked
#[cfg(feature = "board")]
#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}

#[cfg(feature = "board")]
defmt::timestamp!("{=u64}", board::clock::now_us());

/// Terminates the application and makes `probe-run` exit with exit-code = 0
#[cfg(feature = "board")]
pub fn exit() -> ! {
    loop {
        cortex_m::asm::bkpt();
    }
}
