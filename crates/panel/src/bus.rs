//! The wires between the board and the panel: an SPI bus plus a reset line and
//! a data/command line.

use std::thread;
use std::time::Duration;

use rppal::gpio::{Gpio, OutputPin};
use rppal::spi::{BitOrder, Bus, Mode, SlaveSelect, Spi};

use crate::PanelError;

/// The largest single transfer the `spidev` driver accepts by default.
const MAX_TRANSFER: usize = 4096;

/// How long the reset line is held in each state.
const RESET_HOLD: Duration = Duration::from_millis(100);

/// Low-level access to a 4-wire SPI display controller.
#[cfg_attr(test, mockall::automock)]
pub trait PanelBus {
    /// Pulse the reset line (high, low, high), waiting for the controller to
    /// come back up.
    fn hardware_reset(&mut self) -> Result<(), PanelError>;

    /// Send a command byte (data/command line low).
    fn write_command(&mut self, command: u8) -> Result<(), PanelError>;

    /// Send parameter or pixel bytes (data/command line high).
    fn write_data(&mut self, data: &[u8]) -> Result<(), PanelError>;
}

/// How a [SpiBus] is wired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiBusConfig {
    pub clock_hz: u32,
    /// BCM pin number of the reset line.
    pub reset_pin: u8,
    /// BCM pin number of the data/command line.
    pub dc_pin: u8,
}

impl Default for SpiBusConfig {
    fn default() -> Self {
        Self {
            // The 250MHz core clock divided by 8.
            clock_hz: 31_250_000,
            reset_pin: 24,
            dc_pin: 25,
        }
    }
}

/// [PanelBus] over `/dev/spidev0.0` and two GPIO outputs.
///
/// The pins go back to being inputs when this is dropped.
pub struct SpiBus {
    spi: Spi,
    reset: OutputPin,
    dc: OutputPin,
}

impl SpiBus {
    pub fn open(config: SpiBusConfig) -> Result<Self, PanelError> {
        let gpio = Gpio::new()?;
        let reset = gpio.get(config.reset_pin)?.into_output();
        let dc = gpio.get(config.dc_pin)?.into_output();

        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, config.clock_hz, Mode::Mode0)?;
        spi.set_bit_order(BitOrder::MsbFirst)?;

        util::debug_log_info!(
            "SPI0.0 open at {}Hz (reset on GPIO {}, D/C on GPIO {}).",
            config.clock_hz,
            config.reset_pin,
            config.dc_pin
        );

        Ok(Self { spi, reset, dc })
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), PanelError> {
        for chunk in bytes.chunks(MAX_TRANSFER) {
            let written = self.spi.write(chunk)?;
            if written != chunk.len() {
                return Err(PanelError::ShortWrite {
                    expected: chunk.len(),
                    written,
                });
            }
        }
        Ok(())
    }
}

impl PanelBus for SpiBus {
    fn hardware_reset(&mut self) -> Result<(), PanelError> {
        self.reset.set_high();
        thread::sleep(RESET_HOLD);
        self.reset.set_low();
        thread::sleep(RESET_HOLD);
        self.reset.set_high();
        thread::sleep(RESET_HOLD);
        Ok(())
    }

    fn write_command(&mut self, command: u8) -> Result<(), PanelError> {
        self.dc.set_low();
        self.write_all(&[command])
    }

    fn write_data(&mut self, data: &[u8]) -> Result<(), PanelError> {
        self.dc.set_high();
        self.write_all(data)
    }
}
