/// Board startup routines.
use super::clock;
use cortex_m::Peripherals as CorePeripherals;
use stm32f1xx_hal::{
    gpio::{gpiob, Edge, ExtiPin, Floating, Input, Output, PushPull},
    pac,
    prelude::*,
};

/// Sonar trigger pin.
pub type TriggerPin = gpiob::PB0<Output<PushPull>>;

/// Sonar echo pin.
///
/// Raises `EXTI1` on both edges.
pub type EchoPin = gpiob::PB1<Input<Floating>>;

/// Resources provided by the board.
pub struct Board {
    pub trigger: TriggerPin,
    pub echo: EchoPin,
    pub monotonic: clock::RTICMonotonic,
}

/// Starts up the board, returning resources provided by it.
pub fn startup(mut core: CorePeripherals, periph: pac::Peripherals) -> Board {
    let mut afio = periph.AFIO.constrain();
    let flash = periph.FLASH.constrain();
    let rcc = periph.RCC.constrain();

    // Clock tree initialization
    let clocks = clock::clock_tree_setup(flash.acr, rcc);

    // GPIO initialization
    let mut gpiob = periph.GPIOB.split();

    // Sonar initialization. The echo line idles low and pulses high.
    let trigger = gpiob.pb0.into_push_pull_output(&mut gpiob.crl);
    let mut echo = gpiob.pb1.into_floating_input(&mut gpiob.crl);
    echo.make_interrupt_source(&mut afio);
    echo.trigger_on_edge(&periph.EXTI, Edge::RisingFalling);
    echo.enable_interrupt(&periph.EXTI);

    // Monotonic clock initialization.
    let monotonic = clock::monotonic_setup(&mut core.DCB, core.DWT, core.SYST, clocks.sysclk().0);

    defmt::info!("sonar: trigger on PB0, echo on PB1");

    Board {
        trigger,
        echo,
        monotonic,
    }
}
