//! Fitting a video onto the panel.
//!
//! The panel is mounted portrait but videos are usually landscape, so frames
//! are scaled to fit the panel *sideways* and then rotated 90 degrees
//! clockwise. What's left of the panel stays black, with the picture centred.

use std::fmt::{self, Display, Formatter};

use relay::Region;
use thiserror::Error;

/// The panel's native size, portrait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanelSize {
    pub width: u16,
    pub height: u16,
}

impl PanelSize {
    /// The 240x320 ST7789 module.
    pub const ST7789: Self = Self {
        width: 240,
        height: 320,
    };

    /// The whole panel as a [Region].
    pub fn full_region(&self) -> Option<Region> {
        Region::from_size(0, 0, self.width, self.height)
    }
}

impl Default for PanelSize {
    fn default() -> Self {
        Self::ST7789
    }
}

impl Display for PanelSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("The video is {0}x{1}, which has no area.")]
    EmptySource(u32, u32),
    #[error("The panel is {0}, which has no area.")]
    EmptyPanel(PanelSize),
}

/// How a video of some size is scaled, rotated and placed on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    /// Width of the scaled frame before rotation (the panel's long side at
    /// most).
    pub scale_width: u16,
    /// Height of the scaled frame before rotation (the panel's short side at
    /// most).
    pub scale_height: u16,
    /// Where the rotated frame lands on the panel.
    pub region: Region,
}

impl Geometry {
    /// Fit a `source_width` by `source_height` video onto `panel`, rotated
    /// clockwise, as large as possible without cropping.
    pub fn fit(source_width: u32, source_height: u32, panel: PanelSize) -> Result<Self, GeometryError> {
        if source_width == 0 || source_height == 0 {
            return Err(GeometryError::EmptySource(source_width, source_height));
        }
        if panel.width == 0 || panel.height == 0 {
            return Err(GeometryError::EmptyPanel(panel));
        }

        let (src_w, src_h) = (u64::from(source_width), u64::from(source_height));
        let (long, short) = (u64::from(panel.height), u64::from(panel.width));

        // Rotated, the video's width runs along the panel's long side. Compare
        // `short / long >= src_h / src_w` without dividing.
        let (scale_width, scale_height) = if short * src_w >= src_h * long {
            (long, (src_h * long / src_w).max(1))
        } else {
            ((src_w * short / src_h).max(1), short)
        };

        // Both are bounded by the panel's sides, which are `u16`.
        let scale_width = scale_width as u16;
        let scale_height = scale_height as u16;

        // After rotation the scaled height is the on-panel width.
        let left = (panel.width - scale_height) / 2;
        let top = (panel.height - scale_width) / 2;
        let region = Region::new(left, top, left + scale_height - 1, top + scale_width - 1);

        Ok(Self {
            scale_width,
            scale_height,
            region,
        })
    }

    /// The FFmpeg filter graph that turns a source frame into what
    /// [Self::region] expects.
    pub fn filter_expression(&self) -> String {
        format!(
            "scale={}:{},transpose=clock",
            self.scale_width, self.scale_height
        )
    }
}
