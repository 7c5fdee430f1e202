/// Board support library for the WheelTec STM32F103VET6 robot controller.
pub mod clock;
pub mod startup;
