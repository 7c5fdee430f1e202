use crate::time::Clock;
use core::sync::atomic::{AtomicU32, Ordering};
use cortex_m::peripheral::{DCB, DWT, SYST};
use dwt_systick_monotonic::DwtSystick;
use embedded_hal::blocking::delay::DelayUs;
use embedded_time::duration::{Microseconds, Milliseconds};
/// Controller clocks.
use stm32f1xx_hal::{flash::ACR, prelude::*, rcc::Rcc};

/// Core clock frequency.
pub const SYSCLK_HZ: u32 = 72_000_000;

/// Core clock cycles per microsecond.
const CYCLES_PER_US: u32 = SYSCLK_HZ / 1_000_000;

/// Type of the RTIC Monotonic clock.
pub type RTICMonotonic = DwtSystick<SYSCLK_HZ>;

/// Sets up the microcontroller controller's clock tree.
///
/// Configuration:
///
/// - 8MHz HSE.
/// - 72MHz core.
/// - 36MHz APB1.
/// - 72MHz APB2.
pub fn clock_tree_setup(mut acr: ACR, rcc: Rcc) -> stm32f1xx_hal::rcc::Clocks {
    let clocks = rcc
        .cfgr
        .use_hse(8.mhz())
        .hclk(72.mhz())
        .pclk1(36.mhz())
        .pclk2(72.mhz())
        .sysclk(72.mhz())
        .freeze(&mut acr);

    defmt::info!(
        "clock freqs: hclk: {}, pclk1: {}, pclk2: {}, sysclk: {}",
        clocks.hclk().0,
        clocks.pclk1().0,
        clocks.pclk2().0,
        clocks.sysclk().0
    );

    clocks
}

/// Sets up the monotonic clock.
///
/// Also starts the DWT cycle counter that [`DwtClock`] and [`DwtDelay`] use.
pub fn monotonic_setup(dcb: &mut DCB, dwt: DWT, syst: SYST, sysclk: u32) -> RTICMonotonic {
    DwtSystick::new(dcb, dwt, syst, sysclk)
}

/// Upper half of the extended cycle counter.
static CYCLES_HIGH: AtomicU32 = AtomicU32::new(0);
/// Cycle counter value seen by the last call to `cycles`.
static CYCLES_LAST: AtomicU32 = AtomicU32::new(0);

/// Core clock cycles since the cycle counter was started, extended to 64 bits.
///
/// Must be called at least once per counter wrap (~59s at 72MHz) so that no
/// wrap goes unnoticed. The sonar update task does so every 100ms.
fn cycles() -> u64 {
    cortex_m::interrupt::free(|_| {
        let low = DWT::cycle_count();
        let mut high = CYCLES_HIGH.load(Ordering::Relaxed);
        if low < CYCLES_LAST.load(Ordering::Relaxed) {
            high = high.wrapping_add(1);
            CYCLES_HIGH.store(high, Ordering::Relaxed);
        }
        CYCLES_LAST.store(low, Ordering::Relaxed);

        (u64::from(high) << 32) | u64::from(low)
    })
}

/// Microseconds since the cycle counter was started.
pub fn now_us() -> u64 {
    cycles() / u64::from(CYCLES_PER_US)
}

/// Sonar time source backed by the DWT cycle counter.
///
/// Safe to use from interrupt context.
#[derive(Debug, Copy, Clone, Default)]
pub struct DwtClock;

impl Clock for DwtClock {
    fn millis(&self) -> Milliseconds<u32> {
        Milliseconds((now_us() / 1_000) as u32)
    }

    fn micros(&self) -> Microseconds<u32> {
        Microseconds(now_us() as u32)
    }
}

/// Busy-wait delay on the DWT cycle counter.
///
/// The SysTick is owned by the RTIC monotonic, so `cortex_m::delay` is not
/// available.
#[derive(Debug, Copy, Clone, Default)]
pub struct DwtDelay;

impl DelayUs<u32> for DwtDelay {
    fn delay_us(&mut self, us: u32) {
        let start = DWT::cycle_count();
        let cycles = us.saturating_mul(CYCLES_PER_US);
        while DWT::cycle_count().wrapping_sub(start) < cycles {}
    }
}
