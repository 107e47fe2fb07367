//! Panel controller command definitions
//!
//! Opcodes and fixed parameter bytes for the UC8179-class controller pair that
//! drives the 13.3" 1600x1200 panel. Commands are sent over SPI with the DC pin
//! low and the target controller's chip-select asserted; parameters follow
//! with DC high under a fresh chip-select assertion.
//!
//! These values are bit-exact for the panel family. Changing any of them
//! changes what the hardware does.
//!
//! ## Example
//!
//! ```rust,no_run
//! use duo_epd::{command, Controller, PanelBus};
//! # use core::convert::Infallible;
//! # use embedded_hal::delay::DelayNs;
//! # struct Bus;
//! # impl PanelBus for Bus {
//! #     type Error = Infallible;
//! #     fn begin(&mut self) -> Result<(), Infallible> { Ok(()) }
//! #     fn send_command(&mut self, _: Controller, _: u8) -> Result<(), Infallible> { Ok(()) }
//! #     fn send_data(&mut self, _: Controller, _: &[u8]) -> Result<(), Infallible> { Ok(()) }
//! #     fn set_power(&mut self, _: bool) -> Result<(), Infallible> { Ok(()) }
//! #     fn reset<D: DelayNs>(&mut self, _: &mut D, _: u32, _: u32) -> Result<(), Infallible> { Ok(()) }
//! #     fn is_busy(&mut self) -> Result<bool, Infallible> { Ok(false) }
//! # }
//! # let mut bus = Bus;
//! // Enter deep sleep on the master controller
//! let _ = bus.send_command(Controller::Master, command::DEEP_SLEEP);
//! let _ = bus.send_data(Controller::Master, &[command::DEEP_SLEEP_CHECK]);
//! ```

// Configuration commands

/// Panel setting command (0x00)
///
/// Requires 1 byte. Bit 0 (RST_N) low performs a software reset of the
/// controller; the remaining bits select LUT source, resolution and scan
/// direction.
pub const PANEL_SETTING: u8 = 0x00;

/// Panel setting byte that performs a software reset (RST_N cleared)
///
/// Sent with [`PANEL_SETTING`]. The controller restores its register defaults
/// and raises BUSY until done.
pub const PANEL_SETTING_SOFT_RESET: u8 = 0x1E;

/// Default panel setting mode byte (0x1F)
///
/// Black/white mode, LUT from OTP, gate scan up, source shift right, booster on,
/// RST_N high.
pub const PANEL_SETTING_BW_OTP: u8 = 0x1F;

/// Resolution setting command (0x61)
///
/// Requires 4 bytes: horizontal resolution and vertical resolution as two
/// big-endian 16-bit fields. Each controller is given the half width.
pub const RESOLUTION_SETTING: u8 = 0x61;

/// VCOM and data interval setting command (0x50)
///
/// Requires 1 byte: border output and data interval timing.
pub const VCOM_DATA_INTERVAL: u8 = 0x50;

/// Default VCOM and data interval byte (0x97)
///
/// Floating border, new/old data polarity normal, 10 hsync interval.
pub const VCOM_DATA_INTERVAL_DEFAULT: u8 = 0x97;

// Data commands

/// Data start transmission command (0x13)
///
/// Opens the "new data" frame memory. Follow with `(half_width * height) / 8`
/// bytes, MSB first, 1 = white.
pub const START_TRANSMISSION: u8 = 0x13;

// Power and refresh commands

/// Power on command (0x04)
///
/// Turns on the booster and regulators. BUSY is asserted until stable.
pub const POWER_ON: u8 = 0x04;

/// Power off command (0x02)
///
/// Turns off the booster and regulators. BUSY is asserted until done.
pub const POWER_OFF: u8 = 0x02;

/// Display refresh command (0x12)
///
/// Drives the frame memory onto the panel. This is the only command that
/// changes what is visible. BUSY is asserted for the whole waveform.
pub const DISPLAY_REFRESH: u8 = 0x12;

/// Deep sleep command (0x07)
///
/// Requires 1 byte: [`DEEP_SLEEP_CHECK`]. Only a hardware reset wakes the
/// controller.
pub const DEEP_SLEEP: u8 = 0x07;

/// Check code that must accompany [`DEEP_SLEEP`] (0xA5)
pub const DEEP_SLEEP_CHECK: u8 = 0xA5;

/// Fill byte for an all-white frame
pub const WHITE_BYTE: u8 = 0xFF;

/// Fill byte for an all-black frame
pub const BLACK_BYTE: u8 = 0x00;

/// Encode the resolution setting parameters
///
/// Both fields are big-endian 16-bit values.
///
/// ```
/// use duo_epd::command::resolution_bytes;
///
/// assert_eq!(resolution_bytes(800, 1200), [0x03, 0x20, 0x04, 0xB0]);
/// ```
pub const fn resolution_bytes(width: u16, height: u16) -> [u8; 4] {
    let w = width.to_be_bytes();
    let h = height.to_be_bytes();
    [w[0], w[1], h[0], h[1]]
}
