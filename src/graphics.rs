//! Graphics support via embedded-graphics
//!
//! [`PanelFrame`] implements the [`DrawTarget`] trait from the
//! embedded-graphics ecosystem, so frames can be composed with shapes and
//! images before they are stored or displayed. Pixels are written straight
//! into the controller-major layout; nothing is rendered on the panel until
//! the frame is handed to [`Display::display_bitmap`](crate::Display::display_bitmap).
//!
//! ## Example
//!
//! ```
//! use embedded_graphics::{
//!     prelude::*,
//!     primitives::{PrimitiveStyle, Rectangle},
//! };
//! use duo_epd::{Color, Controller, Dimensions, PanelFrame};
//!
//! let mut frame = PanelFrame::white(Dimensions::new(32, 8).unwrap());
//!
//! // Black out the right half
//! let _ = Rectangle::new(Point::new(16, 0), Size::new(16, 8))
//!     .into_styled(PrimitiveStyle::with_fill(Color::Black))
//!     .draw(&mut frame);
//!
//! assert!(frame.half(Controller::Master).iter().all(|b| *b == 0xFF));
//! assert!(frame.half(Controller::Slave).iter().all(|b| *b == 0x00));
//! ```

use core::convert::Infallible;
use embedded_graphics_core::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Point, Size},
    prelude::Pixel,
};

use crate::color::Color;
use crate::frame::PanelFrame;

impl DrawTarget for PanelFrame {
    type Color = Color;
    type Error = Infallible;

    fn draw_iter<Iter>(&mut self, pixels: Iter) -> Result<(), Self::Error>
    where
        Iter: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let sz = self.size();

        for Pixel(Point { x, y }, color) in pixels {
            if x < 0 || y < 0 {
                continue;
            }

            let x = x as u32;
            let y = y as u32;

            if x >= sz.width || y >= sz.height {
                continue;
            }

            self.set_pixel(x as u16, y as u16, color.is_white());
        }

        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color.byte());
        Ok(())
    }
}

impl OriginDimensions for PanelFrame {
    fn size(&self) -> Size {
        let dims = self.dimensions();
        Size::new(u32::from(dims.width), u32::from(dims.height))
    }
}
