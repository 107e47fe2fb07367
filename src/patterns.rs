//! Test pattern frames
//!
//! Generated frames for bringing up a panel: they exercise both controllers,
//! pixel alignment and the panel edges without needing any image on storage.
//! Render one with [`TestPattern::render`] and hand it to
//! [`Display::display_bitmap`](crate::Display::display_bitmap), or write the
//! bytes to storage as `<name>.bin`.
//!
//! ```
//! use duo_epd::{Controller, Dimensions};
//! use duo_epd::patterns::TestPattern;
//!
//! let frame = TestPattern::Split.render(Dimensions::PANEL_13IN3);
//! assert!(frame.half(Controller::Master).iter().all(|b| *b == 0x00));
//! assert!(frame.half(Controller::Slave).iter().all(|b| *b == 0xFF));
//! ```

use crate::config::Dimensions;
use crate::frame::PanelFrame;

/// Checkerboard cell size in pixels
const CHECKER_CELL: u16 = 8;
/// Stripe width in pixels
const STRIPE: u16 = 10;
/// Border thickness in pixels
const BORDER: u16 = 20;
/// Grid cell size in pixels
const GRID_CELL: u16 = 100;
/// Grid line thickness in pixels
const GRID_LINE: u16 = 2;

/// Built-in bring-up patterns
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestPattern {
    /// All white; checks that the panel clears
    White,
    /// All black
    Black,
    /// Left half black, right half white; checks both controllers
    Split,
    /// 8x8 checkerboard; checks pixel alignment
    Checkerboard,
    /// Horizontal stripes, 10 rows each
    StripesHorizontal,
    /// Vertical stripes, 10 columns each
    StripesVertical,
    /// Ordered-dither gradient, white at the top to black at the bottom
    Gradient,
    /// White with a 20 pixel black border; checks the panel edges
    Border,
    /// 100 pixel grid with 2 pixel lines
    Grid,
}

impl TestPattern {
    /// Every pattern, in recommended bring-up order
    pub const ALL: [Self; 9] = [
        Self::White,
        Self::Black,
        Self::Split,
        Self::Checkerboard,
        Self::Border,
        Self::Grid,
        Self::StripesHorizontal,
        Self::StripesVertical,
        Self::Gradient,
    ];

    /// File stem used when the pattern is stored as an image
    pub fn name(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
            Self::Split => "split",
            Self::Checkerboard => "checkerboard",
            Self::StripesHorizontal => "stripes_horizontal",
            Self::StripesVertical => "stripes_vertical",
            Self::Gradient => "gradient",
            Self::Border => "border",
            Self::Grid => "grid",
        }
    }

    /// Whether the pixel at (x, y) is black
    pub fn is_black(&self, x: u16, y: u16, dims: Dimensions) -> bool {
        match self {
            Self::White => false,
            Self::Black => true,
            Self::Split => x < dims.half_width(),
            Self::Checkerboard => ((x / CHECKER_CELL) + (y / CHECKER_CELL)) % 2 == 0,
            Self::StripesHorizontal => (y / STRIPE) % 2 == 0,
            Self::StripesVertical => (x / STRIPE) % 2 == 0,
            Self::Gradient => {
                let threshold = u32::from(y) * 255 / u32::from(dims.height);
                let dither = (u32::from(x) * 17 + u32::from(y) * 13) % 256;
                dither < threshold
            }
            Self::Border => {
                x < BORDER
                    || y < BORDER
                    || x >= dims.width.saturating_sub(BORDER)
                    || y >= dims.height.saturating_sub(BORDER)
            }
            Self::Grid => y % GRID_CELL < GRID_LINE || x % GRID_CELL < GRID_LINE,
        }
    }

    /// Render the pattern for a panel
    pub fn render(&self, dims: Dimensions) -> PanelFrame {
        match self {
            Self::White => return PanelFrame::white(dims),
            Self::Black => return PanelFrame::black(dims),
            _ => {}
        }
        let mut frame = PanelFrame::white(dims);
        for y in 0..dims.height {
            for x in 0..dims.width {
                if self.is_black(x, y, dims) {
                    frame.set_pixel(x, y, false);
                }
            }
        }
        frame
    }
}
