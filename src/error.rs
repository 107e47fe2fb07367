//! Error types for the driver
//!
//! This module defines error types for configuration building ([`BuilderError`]),
//! frame validation ([`FrameError`]) and panel operations ([`Error`]).
//!
//! ## Error Types
//!
//! - [`BuilderError`] - Errors during configuration construction
//! - [`FrameError`] - A byte buffer that is not a full panel frame
//! - [`Error`] - Runtime errors during panel operations
//! - [`InterfaceError`](crate::interface::InterfaceError) - Low-level hardware communication errors
//! - [`PipelineError`](crate::pipeline::PipelineError) - Storage-to-panel failures
//!
//! A busy line that never clears is not an error: the panel state machine logs
//! it and carries on.
//!
//! ## Example
//!
//! ```
//! use duo_epd::{Builder, BuilderError, Dimensions};
//!
//! // Missing dimensions
//! let result = Builder::new().build();
//! assert!(matches!(result, Err(BuilderError::MissingDimensions)));
//!
//! // Halves not byte-aligned
//! let result = Dimensions::new(1608, 1200);
//! assert!(result.is_err());
//! ```

use crate::config::{MAX_HEIGHT, MAX_WIDTH};
use crate::interface::PanelBus;

/// Errors that can occur when driving the panel
///
/// Generic over the bus type to preserve the specific error type.
#[derive(Debug)]
pub enum Error<I: PanelBus> {
    /// Bus error (SPI/GPIO)
    ///
    /// Wraps the underlying hardware error from the [`PanelBus`] implementation.
    Interface(I::Error),
    /// An operation was requested before [`Display::begin`](crate::Display::begin)
    NotStarted,
    /// A null or zero-length frame was handed to
    /// [`Display::display_bitmap`](crate::Display::display_bitmap)
    ///
    /// No bus transaction is attempted.
    EmptyFrame,
}

impl<I: PanelBus> core::fmt::Display for Error<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Interface(e) => write!(f, "Interface error: {e:?}"),
            Self::NotStarted => write!(f, "Panel not started"),
            Self::EmptyFrame => write!(f, "Empty frame"),
        }
    }
}

impl<I: PanelBus + core::fmt::Debug> core::error::Error for Error<I> {}

/// Errors that can occur when building configuration
///
/// These errors occur during the builder pattern before the display is created.
#[derive(Debug)]
pub enum BuilderError {
    /// Dimensions were not specified
    ///
    /// [`Builder::dimensions()`](crate::config::Builder::dimensions) must be called before building.
    MissingDimensions,
    /// Invalid dimensions provided
    ///
    /// See [`Dimensions::new()`](crate::config::Dimensions::new) for constraints.
    InvalidDimensions {
        /// Width requested
        width: u16,
        /// Height requested
        height: u16,
    },
    /// Poll interval is zero or reset timing is below the controller minimum
    InvalidTiming,
}

impl core::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingDimensions => write!(f, "Dimensions must be specified"),
            Self::InvalidDimensions { width, height } => write!(
                f,
                "Invalid dimensions {width}x{height} (max {MAX_WIDTH}x{MAX_HEIGHT}, width must be multiple of 16)"
            ),
            Self::InvalidTiming => write!(f, "Invalid timing configuration"),
        }
    }
}

impl core::error::Error for BuilderError {}

/// A byte buffer that cannot be a full panel frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameError {
    /// Buffer length differs from `(width * height) / 8`
    WrongSize {
        /// Required size in bytes
        expected: usize,
        /// Provided size in bytes
        provided: usize,
    },
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WrongSize { expected, provided } => write!(
                f,
                "Wrong frame size: expected {expected} bytes, provided {provided}"
            ),
        }
    }
}

impl core::error::Error for FrameError {}
