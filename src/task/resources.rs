//! Peripheral groups handed to the tasks, and the interrupt bindings they need.

use assign_resources::assign_resources;
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::InterruptHandler;
use embassy_rp::{Peri, bind_interrupts, peripherals};

// group the peripherals into resources, to be used in the tasks
// the resources are assigned to the tasks in main.rs, the buttons take a single pin each
assign_resources! {
    wifi: WifiResources {
        pwr_pin: PIN_23,
        cs_pin: PIN_25,
        pio_sm: PIO0,
        dio_pin: PIN_24,
        clk_pin: PIN_29,
        dma_ch: DMA_CH0,
    },
    neopixel: NeopixelResources {
        inner_spi: SPI0,
        clk_pin: PIN_18,
        mosi_pin: PIN_19,
        tx_dma_ch: DMA_CH1,
    },
    alarm_output: AlarmOutputResources {
        output_pin: PIN_15,
    },
}

bind_interrupts!(pub struct Irqs {
    PIO0_IRQ_0 => InterruptHandler<PIO0>;
});
