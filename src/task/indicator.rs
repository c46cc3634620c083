//! # Indicator task
//! Drives the neopixel LED ring that shows the alarm colour.
//!
//! The alarm loop decides the colour; this task only puts it on the ring, so a slow SPI
//! transfer never delays the poll loop.
use alarm_core::{Color, IndicatorSink};
use defmt::{debug, info};
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{self, Spi};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use smart_leds::{RGB8, SmartLedsWriteAsync, brightness};
use ws2812_async::{Grb, Ws2812};

use crate::task::resources::NeopixelResources;

/// Signal carrying the colour the ring should show
static INDICATOR_SIGNAL: Signal<CriticalSectionRawMutex, Color> = Signal::new();

/// Number of LEDs in the ring
const NUM_LEDS: usize = 16;

/// Brightness of the ring, out of 255
const BRIGHTNESS: u8 = 10;

/// SPI clock the WS2812 bit encoding is timed for
const SPI_FREQUENCY: u32 = 3_800_000;

/// Type alias for the neopixel LED controller
type NeopixelType = Ws2812<Spi<'static, SPI0, spi::Async>, Grb, { 12 * NUM_LEDS }>;

/// Forwards indicator colours to the ring task, skipping repeats of the current colour
#[derive(Default)]
pub struct SignalIndicator {
    /// The colour last handed to the ring task
    current: Option<Color>,
}

impl SignalIndicator {
    /// Creates an indicator that has not shown anything yet
    pub const fn new() -> Self {
        Self { current: None }
    }
}

impl IndicatorSink for SignalIndicator {
    fn set_indicator(&mut self, color: Color) {
        if self.current != Some(color) {
            self.current = Some(color);
            INDICATOR_SIGNAL.signal(color);
        }
    }
}

/// Shows `color` on every LED of the ring
async fn fill(np: &mut NeopixelType, color: Color) {
    let data = [RGB8::new(color.r, color.g, color.b); NUM_LEDS];
    let _ = np.write(brightness(data.iter().copied(), BRIGHTNESS)).await;
}

#[embassy_executor::task]
pub async fn indicator_handler(r: NeopixelResources) {
    info!("Indicator task start");

    let mut config = spi::Config::default();
    config.frequency = SPI_FREQUENCY;
    let spi = Spi::new_txonly(r.inner_spi, r.clk_pin, r.mosi_pin, r.tx_dma_ch, config);
    let mut np: NeopixelType = Ws2812::new(spi);

    // All off initially
    fill(&mut np, Color::OFF).await;

    loop {
        let color = INDICATOR_SIGNAL.wait().await;
        debug!("Indicator colour {}", color);
        fill(&mut np, color).await;
    }
}
