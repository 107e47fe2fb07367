//! Dual-Controller E-Paper Frame Driver
//!
//! A driver for 13.3" 1600x1200 bi-level e-paper panels built from two
//! UC8179-class controllers, one per vertical half, sharing SPI clock, data,
//! DC, reset and busy lines with a chip-select each. On top of the panel
//! driver sit the pieces of a Wi-Fi picture frame: an image pipeline from
//! storage to panel, a boot-time network role state machine and a captive
//! DNS responder for provisioning.
//!
//! ## Features
//!
//! - `no_std` + `alloc`
//! - `embedded-hal` v1.0 support
//! - `embedded-graphics` integration (with `graphics` feature)
//! - Bounded busy-waits that log and continue instead of hanging
//! - Storage, key/value and radio collaborators behind traits
//! - Host directory storage (with `std` feature)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use core::convert::Infallible;
//! use embedded_hal::delay::DelayNs;
//! use embedded_hal::digital::{InputPin, OutputPin};
//! use embedded_hal::spi::SpiBus;
//! use duo_epd::{Builder, ChipSelects, Dimensions, Display, Interface};
//!
//! # struct MockSpi;
//! # impl embedded_hal::spi::ErrorType for MockSpi { type Error = Infallible; }
//! # impl SpiBus for MockSpi {
//! #     fn read(&mut self, _: &mut [u8]) -> Result<(), Self::Error> { Ok(()) }
//! #     fn write(&mut self, _: &[u8]) -> Result<(), Self::Error> { Ok(()) }
//! #     fn transfer(&mut self, _: &mut [u8], _: &[u8]) -> Result<(), Self::Error> { Ok(()) }
//! #     fn transfer_in_place(&mut self, _: &mut [u8]) -> Result<(), Self::Error> { Ok(()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct MockPin;
//! # impl embedded_hal::digital::ErrorType for MockPin { type Error = Infallible; }
//! # impl OutputPin for MockPin {
//! #     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl InputPin for MockPin {
//! #     fn is_high(&mut self) -> Result<bool, Self::Error> { Ok(true) }
//! #     fn is_low(&mut self) -> Result<bool, Self::Error> { Ok(false) }
//! # }
//! # struct MockDelay;
//! # impl DelayNs for MockDelay { fn delay_ns(&mut self, _ns: u32) {} }
//! # let mut delay = MockDelay;
//! let chip_selects = ChipSelects {
//!     master: MockPin,
//!     slave: MockPin,
//! };
//! let interface = Interface::new(MockSpi, chip_selects, MockPin, MockPin, MockPin, MockPin);
//! let config = match Builder::new().dimensions(Dimensions::PANEL_13IN3).build() {
//!     Ok(config) => config,
//!     Err(_) => return,
//! };
//!
//! let mut display = Display::new(interface, config);
//! let _ = display.begin();
//! let _ = display.clear(&mut delay);
//! let _ = display.sleep(&mut delay);
//! ```

#![no_std]

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

/// Pixel colors
pub mod color;
/// Panel command definitions
pub mod command;
/// Display configuration types and builder
pub mod config;
/// Device context: boot, scheduled refresh and web-facing operations
pub mod device;
/// Core display operations
pub mod display;
/// Captive-portal DNS responder
pub mod dns;
/// Error types for the driver
pub mod error;
/// Full-panel frame buffers
pub mod frame;
/// Hardware interface abstraction
pub mod interface;
/// Network role state machine
pub mod network;
/// Built-in test pattern frames
pub mod patterns;
/// Storage-to-panel image pipeline
pub mod pipeline;
/// Storage and key/value collaborators
pub mod storage;
/// Time-bounded polling
pub mod wait;

/// Graphics support via embedded-graphics (requires `graphics` feature)
#[cfg(feature = "graphics")]
pub mod graphics;

#[cfg(test)]
mod mock;

pub use color::Color;
pub use config::{Builder, Config, Dimensions, MAX_HEIGHT, MAX_WIDTH};
pub use device::{Device, DeviceConfig, DeviceError, RefreshSchedule};
pub use display::{Display, PanelState};
pub use error::{BuilderError, Error, FrameError};
pub use frame::PanelFrame;
pub use interface::{ChipSelects, Controller, Interface, InterfaceError, PanelBus};
pub use network::{Credentials, NetworkConfig, NetworkDriver, NetworkError, NetworkRole, RoleResolver};
pub use pipeline::{ImagePipeline, PipelineError};
pub use storage::{KeyValueStore, Preferences, Storage};
pub use wait::{BoundedWait, WaitOutcome};

#[cfg(feature = "std")]
pub use storage::DirStorage;
