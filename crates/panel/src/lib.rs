//! The output side of the player: where on the panel the video goes
//! ([Geometry]) and how pixels get there ([St7789]).

mod bus;
mod geometry;
mod st7789;

pub use bus::{PanelBus, SpiBus, SpiBusConfig};
pub use geometry::{Geometry, GeometryError, PanelSize};
pub use st7789::St7789;

use thiserror::Error;

/// Talking to the panel failed.
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("SPI error: {0}")]
    Spi(#[from] rppal::spi::Error),
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
    #[error("Only {written} of {expected} bytes reached the panel.")]
    ShortWrite { expected: usize, written: usize },
}
