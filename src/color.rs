//! Pixel colors for bi-level e-paper panels
//!
//! Each pixel is one bit in the frame buffer:
//!
//! | Color | Bit |
//! |-------|-----|
//! | Black | 0   |
//! | White | 1   |
//!
//! ## Example
//!
//! ```
//! use duo_epd::Color;
//!
//! assert_eq!(Color::Black.byte(), 0x00);
//! assert_eq!(Color::White.byte(), 0xFF);
//! ```

/// Colors supported by the panel
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color {
    /// Black pixels
    Black,
    /// White pixels
    White,
}

#[cfg(feature = "graphics")]
impl embedded_graphics_core::prelude::PixelColor for Color {
    type Raw = embedded_graphics_core::pixelcolor::raw::RawU1;
}

#[cfg(feature = "graphics")]
impl From<embedded_graphics_core::pixelcolor::BinaryColor> for Color {
    /// `On` is ink (black), `Off` is paper (white)
    fn from(color: embedded_graphics_core::pixelcolor::BinaryColor) -> Self {
        match color {
            embedded_graphics_core::pixelcolor::BinaryColor::On => Self::Black,
            embedded_graphics_core::pixelcolor::BinaryColor::Off => Self::White,
        }
    }
}

impl Color {
    /// Byte value with all eight pixels in this color
    pub fn byte(self) -> u8 {
        match self {
            Self::Black => crate::command::BLACK_BYTE,
            Self::White => crate::command::WHITE_BYTE,
        }
    }

    /// Whether the pixel bit is set
    pub fn is_white(self) -> bool {
        self == Self::White
    }
}
