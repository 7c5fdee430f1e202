#![deny(unsafe_code)]
#![no_std]
#![no_main]

// Panic handler, logging, all those nice things.
use sonar_fw as _;

#[rtic::app(device = stm32f1xx_hal::pac, peripherals = true, dispatchers = [RTCALARM])]
mod app {
    use sonar_fw::board::clock::{DwtClock, DwtDelay, RTICMonotonic};
    use sonar_fw::board::startup::{self, EchoPin, TriggerPin};
    use sonar_fw::rangefinder::Rangefinder;
    use sonar_fw::sonar::{self, Config, EchoCapture, EchoSlot, Sonar};
    use stm32f1xx_hal::gpio::ExtiPin;

    #[monotonic(binds = SysTick, default = true)]
    type MyMono = RTICMonotonic;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        /// Trigger side of the sensor (scheduler context).
        sonar: Sonar<'static, TriggerPin, DwtDelay, DwtClock>,
        /// Echo side of the sensor (interrupt context).
        echo: EchoCapture<'static, DwtClock>,
        echo_pin: EchoPin,
    }

    #[init(local = [slot: EchoSlot = EchoSlot::new()])]
    fn init(cx: init::Context) -> (Shared, Local, init::Monotonics) {
        let board = startup::startup(cx.core, cx.device);
        let slot: &'static EchoSlot = cx.local.slot;

        let mut sonar = Sonar::new(board.trigger, DwtDelay, DwtClock, slot, Config::default());
        sonar.init();
        let echo = EchoCapture::new(DwtClock, slot);

        defmt::info!("sonar: {}, {}", sonar.config(), sonar.info());
        sonar_update::spawn().ok();
        defmt::info!("init complete");

        (
            Shared {},
            Local {
                sonar,
                echo,
                echo_pin: board.echo,
            },
            init::Monotonics(board.monotonic),
        )
    }

    #[idle]
    fn idle(_: idle::Context) -> ! {
        loop {}
    }

    /// Fires the trigger and reports the range of the previous cycle.
    #[task(local = [sonar])]
    fn sonar_update(cx: sonar_update::Context) {
        let sonar = cx.local.sonar;
        sonar.update();
        defmt::debug!("range: {=i32}", sonar.read());

        sonar_update::spawn_after(sonar::UPDATE_INTERVAL).ok();
    }

    /// Echo line edge.
    #[task(binds = EXTI1, priority = 2, local = [echo, echo_pin])]
    fn echo_edge(cx: echo_edge::Context) {
        cx.local.echo.handle_interrupt(&*cx.local.echo_pin);
        cx.local.echo_pin.clear_interrupt_pending_bit();
    }
}
