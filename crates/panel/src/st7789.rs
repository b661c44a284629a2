//! The module contains [St7789], an [OutputSink] for ST7789 display
//! controllers.

use relay::{OutputSink, Region, SinkError};

use crate::bus::{PanelBus, SpiBus, SpiBusConfig};
use crate::{PanelError, PanelSize};

const CASET: u8 = 0x2A;
const RASET: u8 = 0x2B;
const RAMWR: u8 = 0x2C;

/// Commands (and their parameters) sent after a hardware reset.
const INIT_SEQUENCE: &[(u8, &[u8])] = &[
    // Memory access control: default scan direction.
    (0x36, &[0x00]),
    // Interface pixel format: 16 bits per pixel (RGB565).
    (0x3A, &[0x05]),
    // Porch control.
    (0xB2, &[0x0C, 0x0C, 0x00, 0x33, 0x33]),
    // Gate control.
    (0xB7, &[0x35]),
    // VCOM.
    (0xBB, &[0x19]),
    // LCM control.
    (0xC0, &[0x2C]),
    // Enable VDV and VRH from the following two commands.
    (0xC2, &[0x01]),
    (0xC3, &[0x12]),
    (0xC4, &[0x20]),
    // 60Hz refresh in normal mode.
    (0xC6, &[0x0F]),
    // Power control.
    (0xD0, &[0xA4, 0xA1]),
    // Positive gamma.
    (
        0xE0,
        &[0xD0, 0x04, 0x0D, 0x11, 0x13, 0x2B, 0x3F, 0x54, 0x4C, 0x18, 0x0D, 0x0B, 0x1F, 0x23],
    ),
    // Negative gamma.
    (
        0xE1,
        &[0xD0, 0x04, 0x0C, 0x11, 0x13, 0x2C, 0x3F, 0x44, 0x51, 0x2F, 0x1F, 0x1F, 0x20, 0x23],
    ),
    // Inversion on.
    (0x21, &[]),
    // Sleep out.
    (0x11, &[]),
    // Display on.
    (0x29, &[]),
];

/// An ST7789 panel. Creating one resets, initializes and clears the panel.
///
/// [OutputSink::configure] picks the window later transmissions fill. Every
/// transmission that isn't a continuation re-selects that window first, so
/// each frame starts at the window's top-left pixel.
#[derive(Debug)]
pub struct St7789<B = SpiBus> {
    bus: B,
    size: PanelSize,
    window: Region,
}

impl St7789<SpiBus> {
    /// Open the panel on the board's SPI bus.
    pub fn open(config: SpiBusConfig, size: PanelSize) -> Result<Self, PanelError> {
        Self::new(SpiBus::open(config)?, size)
    }
}

impl<B: PanelBus> St7789<B> {
    pub fn new(bus: B, size: PanelSize) -> Result<Self, PanelError> {
        let mut panel = Self {
            bus,
            size,
            window: Region::new(0, 0, size.width.saturating_sub(1), size.height.saturating_sub(1)),
        };

        panel.bus.hardware_reset()?;
        for (command, params) in INIT_SEQUENCE {
            panel.bus.write_command(*command)?;
            if !params.is_empty() {
                panel.bus.write_data(params)?;
            }
        }
        panel.clear()?;

        util::debug_log_info!("ST7789 ({size}) initialized.");
        Ok(panel)
    }

    pub fn size(&self) -> PanelSize {
        self.size
    }

    /// Paint the whole panel black. The configured window is kept.
    pub fn clear(&mut self) -> Result<(), PanelError> {
        let Some(full) = self.size.full_region() else {
            return Ok(());
        };

        self.select(full)?;
        let blank_row = vec![0; usize::from(self.size.width) * 2];
        for _ in 0..self.size.height {
            self.bus.write_data(&blank_row)?;
        }
        Ok(())
    }

    /// Give the bus back.
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Point the controller's write cursor at the top-left of `region`.
    fn select(&mut self, region: Region) -> Result<(), PanelError> {
        let [left_hi, left_lo] = region.left.to_be_bytes();
        let [right_hi, right_lo] = region.right.to_be_bytes();
        let [top_hi, top_lo] = region.top.to_be_bytes();
        let [bottom_hi, bottom_lo] = region.bottom.to_be_bytes();

        self.bus.write_command(CASET)?;
        self.bus.write_data(&[left_hi, left_lo, right_hi, right_lo])?;
        self.bus.write_command(RASET)?;
        self.bus.write_data(&[top_hi, top_lo, bottom_hi, bottom_lo])?;
        self.bus.write_command(RAMWR)
    }
}

impl<B: PanelBus> OutputSink for St7789<B> {
    fn configure(&mut self, region: Region) -> Result<(), SinkError> {
        if !region.is_valid() || region.right >= self.size.width || region.bottom >= self.size.height {
            return Err(SinkError::InvalidRegion(region));
        }

        util::debug_log_info!("Panel window set to {region}.");
        self.window = region;
        Ok(())
    }

    fn transmit(&mut self, data: &[u8], continuation: bool) -> Result<(), SinkError> {
        if !continuation {
            self.select(self.window)
                .map_err(|e| SinkError::Transmit(Box::new(e)))?;
        }

        if !data.is_empty() {
            self.bus
                .write_data(data)
                .map_err(|e| SinkError::Transmit(Box::new(e)))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MockPanelBus;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Reset,
        Command(u8),
        Data(Vec<u8>),
    }

    #[derive(Debug, Default)]
    struct RecordingBus(Vec<Op>);

    impl PanelBus for RecordingBus {
        fn hardware_reset(&mut self) -> Result<(), PanelError> {
            self.0.push(Op::Reset);
            Ok(())
        }

        fn write_command(&mut self, command: u8) -> Result<(), PanelError> {
            self.0.push(Op::Command(command));
            Ok(())
        }

        fn write_data(&mut self, data: &[u8]) -> Result<(), PanelError> {
            self.0.push(Op::Data(data.to_vec()));
            Ok(())
        }
    }

    const SMALL: PanelSize = PanelSize {
        width: 4,
        height: 3,
    };

    fn ready_panel() -> St7789<RecordingBus> {
        let mut panel = St7789::new(RecordingBus::default(), SMALL).unwrap();
        panel.bus.0.clear();
        panel
    }

    #[test]
    fn init_resets_configures_and_clears() {
        let ops = St7789::new(RecordingBus::default(), SMALL).unwrap().into_bus().0;

        assert_eq!(ops[0], Op::Reset);
        assert_eq!(ops[1], Op::Command(0x36));
        assert_eq!(ops[3], Op::Command(0x3A));
        assert_eq!(ops[4], Op::Data(vec![0x05]));

        let display_on = ops.iter().position(|op| *op == Op::Command(0x29)).unwrap();
        assert_eq!(
            ops[display_on + 1..display_on + 6],
            [
                Op::Command(CASET),
                Op::Data(vec![0, 0, 0, 3]),
                Op::Command(RASET),
                Op::Data(vec![0, 0, 0, 2]),
                Op::Command(RAMWR),
            ]
        );

        let blank_rows = &ops[display_on + 6..];
        assert_eq!(blank_rows.len(), 3);
        assert!(blank_rows.iter().all(|op| *op == Op::Data(vec![0; 8])));
    }

    #[test]
    fn new_frame_selects_the_configured_window() {
        let mut panel = ready_panel();
        panel.configure(Region::new(1, 0, 2, 2)).unwrap();

        panel.transmit(&[], false).unwrap();
        panel.transmit(&[0xAB; 4], true).unwrap();

        assert_eq!(
            panel.into_bus().0,
            vec![
                Op::Command(CASET),
                Op::Data(vec![0, 1, 0, 2]),
                Op::Command(RASET),
                Op::Data(vec![0, 0, 0, 2]),
                Op::Command(RAMWR),
                Op::Data(vec![0xAB; 4]),
            ]
        );
    }

    #[test]
    fn window_bytes_are_big_endian() {
        let mut panel = St7789::new(
            RecordingBus::default(),
            PanelSize {
                width: 400,
                height: 400,
            },
        )
        .unwrap();
        panel.bus.0.clear();
        panel.configure(Region::new(0x102, 0x10, 0x18F, 0x120)).unwrap();
        panel.transmit(&[], false).unwrap();

        let ops = panel.into_bus().0;
        assert_eq!(ops[1], Op::Data(vec![0x01, 0x02, 0x01, 0x8F]));
        assert_eq!(ops[3], Op::Data(vec![0x00, 0x10, 0x01, 0x20]));
    }

    #[test]
    fn rejects_windows_off_the_panel() {
        let mut panel = ready_panel();

        for region in [Region::new(0, 0, 4, 2), Region::new(0, 0, 3, 3), Region::new(2, 0, 1, 2)] {
            assert!(matches!(
                panel.configure(region),
                Err(SinkError::InvalidRegion(r)) if r == region
            ));
        }
        assert!(panel.into_bus().0.is_empty());
    }

    #[test]
    fn bus_failure_is_a_transmit_error() {
        let mut bus = MockPanelBus::new();
        bus.expect_hardware_reset().times(1).returning(|| Ok(()));
        bus.expect_write_command().returning(|_| Ok(()));
        bus.expect_write_data()
            .withf(|data| data.to_vec() != [1, 2])
            .returning(|_| Ok(()));
        bus.expect_write_data()
            .withf(|data| data.to_vec() == [1, 2])
            .times(1)
            .returning(|_| {
                Err(PanelError::ShortWrite {
                    expected: 2,
                    written: 0,
                })
            });

        let mut panel = St7789::new(bus, SMALL).unwrap();
        let result = panel.transmit(&[1, 2], true);

        assert!(matches!(result, Err(SinkError::Transmit(_))));
    }

    #[test]
    fn reset_failure_stops_init() {
        let mut bus = MockPanelBus::new();
        bus.expect_hardware_reset().times(1).returning(|| {
            Err(PanelError::ShortWrite {
                expected: 1,
                written: 0,
            })
        });
        bus.expect_write_command().never();
        bus.expect_write_data().never();

        assert!(St7789::new(bus, SMALL).is_err());
    }
}
