//! Full-panel frame buffers
//!
//! A [`PanelFrame`] is exactly `(width * height) / 8` bytes, one bit per pixel,
//! MSB first, 1 = white and 0 = black. The buffer is laid out controller-major:
//! the first half holds the master's (left) columns, row by row at half width,
//! and the second half holds the slave's (right) columns the same way. That is
//! the layout the panel state machine streams, so a frame can be split at its
//! midpoint without any copying.
//!
//! Whole-panel row-major images convert with
//! [`PanelFrame::from_row_major`] and [`PanelFrame::to_row_major`].
//!
//! ## Example
//!
//! ```
//! use duo_epd::{Controller, Dimensions, PanelFrame};
//!
//! let dims = Dimensions::new(32, 2).unwrap();
//! let mut frame = PanelFrame::white(dims);
//! frame.set_pixel(16, 0, false);
//!
//! // Column 16 is the first column of the slave's half
//! assert_eq!(frame.half(Controller::Slave)[0], 0x7F);
//! assert_eq!(frame.pixel(16, 0), Some(false));
//! ```

use alloc::vec;
use alloc::vec::Vec;

use crate::command::{BLACK_BYTE, WHITE_BYTE};
use crate::config::Dimensions;
use crate::error::FrameError;
use crate::interface::Controller;

/// A validated full-panel frame
#[derive(Clone, Debug, PartialEq)]
pub struct PanelFrame {
    bytes: Vec<u8>,
    dimensions: Dimensions,
}

impl PanelFrame {
    /// Wrap a controller-major buffer
    ///
    /// # Errors
    ///
    /// Returns `FrameError::WrongSize` unless the buffer is exactly
    /// `dims.buffer_size()` bytes.
    pub fn new(bytes: Vec<u8>, dims: Dimensions) -> Result<Self, FrameError> {
        let expected = dims.buffer_size();
        if bytes.len() != expected {
            return Err(FrameError::WrongSize {
                expected,
                provided: bytes.len(),
            });
        }
        Ok(Self {
            bytes,
            dimensions: dims,
        })
    }

    /// A frame with every byte set to `value`
    pub fn filled(dims: Dimensions, value: u8) -> Self {
        Self {
            bytes: vec![value; dims.buffer_size()],
            dimensions: dims,
        }
    }

    /// An all-white frame
    pub fn white(dims: Dimensions) -> Self {
        Self::filled(dims, WHITE_BYTE)
    }

    /// An all-black frame
    pub fn black(dims: Dimensions) -> Self {
        Self::filled(dims, BLACK_BYTE)
    }

    /// Build a frame from a whole-panel row-major image
    ///
    /// # Errors
    ///
    /// Returns `FrameError::WrongSize` unless the image is exactly
    /// `dims.buffer_size()` bytes.
    pub fn from_row_major(image: &[u8], dims: Dimensions) -> Result<Self, FrameError> {
        let expected = dims.buffer_size();
        if image.len() != expected {
            return Err(FrameError::WrongSize {
                expected,
                provided: image.len(),
            });
        }
        let row = dims.row_bytes();
        let half_row = row / 2;
        let mut bytes = Vec::with_capacity(expected);
        for column_band in 0..2 {
            for line in image.chunks_exact(row) {
                let start = column_band * half_row;
                bytes.extend_from_slice(&line[start..start + half_row]);
            }
        }
        Ok(Self {
            bytes,
            dimensions: dims,
        })
    }

    /// Convert back to a whole-panel row-major image
    pub fn to_row_major(&self) -> Vec<u8> {
        let half_row = self.dimensions.row_bytes() / 2;
        let (left, right) = self.halves();
        let mut image = Vec::with_capacity(self.bytes.len());
        for (l, r) in left.chunks_exact(half_row).zip(right.chunks_exact(half_row)) {
            image.extend_from_slice(l);
            image.extend_from_slice(r);
        }
        image
    }

    /// Master (left) and slave (right) half-frames
    pub fn halves(&self) -> (&[u8], &[u8]) {
        self.bytes.split_at(self.bytes.len() / 2)
    }

    /// One controller's half-frame
    pub fn half(&self, controller: Controller) -> &[u8] {
        let (left, right) = self.halves();
        match controller {
            Controller::Master => left,
            Controller::Slave => right,
        }
    }

    /// Pixel colour at (x, y), `true` for white
    ///
    /// Returns `None` outside the panel.
    pub fn pixel(&self, x: u16, y: u16) -> Option<bool> {
        let (index, mask) = self.locate(x, y)?;
        Some(self.bytes[index] & mask != 0)
    }

    /// Set the pixel at (x, y); coordinates outside the panel are ignored
    pub fn set_pixel(&mut self, x: u16, y: u16, white: bool) {
        if let Some((index, mask)) = self.locate(x, y) {
            if white {
                self.bytes[index] |= mask;
            } else {
                self.bytes[index] &= !mask;
            }
        }
    }

    /// Fill the whole frame with `value`
    pub fn fill(&mut self, value: u8) {
        self.bytes.fill(value);
    }

    /// Frame bytes in controller-major order
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable frame bytes in controller-major order
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Take the underlying buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Panel dimensions of this frame
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Byte index and bit mask of a pixel
    fn locate(&self, x: u16, y: u16) -> Option<(usize, u8)> {
        let dims = self.dimensions;
        if x >= dims.width || y >= dims.height {
            return None;
        }
        let half_width = dims.half_width();
        let (base, column) = if x < half_width {
            (0, x)
        } else {
            (dims.half_buffer_size(), x - half_width)
        };
        let half_row = half_width as usize / 8;
        let index = base + y as usize * half_row + column as usize / 8;
        Some((index, 0x80 >> (column % 8)))
    }
}

impl AsRef<[u8]> for PanelFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
