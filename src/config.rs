//! Display configuration types and builder

pub use crate::error::BuilderError;

/// Largest supported panel width in pixels (two controllers, 1600 sources)
pub const MAX_WIDTH: u16 = 1600;

/// Largest supported panel height in pixels
pub const MAX_HEIGHT: u16 = 1200;

/// Default busy-wait ceiling in milliseconds
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 30_000;

/// Default interval between busy line polls in milliseconds
pub const DEFAULT_BUSY_POLL_MS: u32 = 10;

/// Default SPI clock in Hz
pub const DEFAULT_SPI_CLOCK_HZ: u32 = 4_000_000;

/// Panel dimensions
///
/// The width spans both controllers. Each controller owns one vertical half
/// of `width / 2` columns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dimensions {
    /// Full panel width in pixels
    pub width: u16,
    /// Panel height in pixels
    pub height: u16,
}

impl Dimensions {
    /// The 13.3" 1600x1200 panel
    pub const PANEL_13IN3: Self = Self {
        width: MAX_WIDTH,
        height: MAX_HEIGHT,
    };

    /// Create new dimensions with validation
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::InvalidDimensions` if:
    /// - width or height is zero
    /// - width > MAX_WIDTH or height > MAX_HEIGHT
    /// - width % 16 != 0 (each half must be byte-aligned)
    pub fn new(width: u16, height: u16) -> Result<Self, BuilderError> {
        if width == 0 || width > MAX_WIDTH || width % 16 != 0 {
            return Err(BuilderError::InvalidDimensions { width, height });
        }
        if height == 0 || height > MAX_HEIGHT {
            return Err(BuilderError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Width of one controller's half in pixels
    pub fn half_width(&self) -> u16 {
        self.width / 2
    }

    /// Size of a full frame in bytes
    pub fn buffer_size(&self) -> usize {
        (self.width as usize * self.height as usize) / 8
    }

    /// Size of one controller's half-frame in bytes
    pub fn half_buffer_size(&self) -> usize {
        (self.half_width() as usize * self.height as usize) / 8
    }

    /// Bytes per row of a full frame
    pub fn row_bytes(&self) -> usize {
        self.width as usize / 8
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::PANEL_13IN3
    }
}

/// Display configuration
///
/// This struct holds the fixed panel parameters and the timing policy used by
/// [`Display`](crate::Display). Use `Builder` to create a Config.
#[derive(Clone, Debug)]
pub struct Config {
    /// Panel dimensions
    pub dimensions: Dimensions,
    /// Panel setting mode byte
    pub panel_setting: u8,
    /// VCOM and data interval byte
    pub vcom_data_interval: u8,
    /// Busy-wait ceiling in milliseconds (0 waits forever)
    pub busy_timeout_ms: u32,
    /// Interval between busy line polls in milliseconds
    pub busy_poll_ms: u32,
    /// Delay after raising power-enable before the reset pulse
    pub power_settle_ms: u32,
    /// Reset line hold time in milliseconds
    pub reset_hold_ms: u32,
    /// Settle time after releasing reset in milliseconds
    pub reset_settle_ms: u32,
    /// Settle time between display-refresh and the final busy-wait
    pub refresh_settle_ms: u32,
    /// SPI clock the bus was configured with, in Hz
    pub spi_clock_hz: u32,
}

/// Builder for constructing display configuration
///
/// # Example
///
/// ```rust,no_run
/// use duo_epd::{Builder, Dimensions};
///
/// let dims = match Dimensions::new(1600, 1200) {
///     Ok(dims) => dims,
///     Err(_) => return,
/// };
/// let config = match Builder::new().dimensions(dims).busy_timeout_ms(5_000).build() {
///     Ok(config) => config,
///     Err(_) => return,
/// };
/// let _ = config;
/// ```
#[must_use]
pub struct Builder {
    dimensions: Option<Dimensions>,
    panel_setting: u8,
    vcom_data_interval: u8,
    busy_timeout_ms: u32,
    busy_poll_ms: u32,
    power_settle_ms: u32,
    reset_hold_ms: u32,
    reset_settle_ms: u32,
    refresh_settle_ms: u32,
    spi_clock_hz: u32,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            dimensions: None,
            panel_setting: crate::command::PANEL_SETTING_BW_OTP,
            vcom_data_interval: crate::command::VCOM_DATA_INTERVAL_DEFAULT,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            busy_poll_ms: DEFAULT_BUSY_POLL_MS,
            power_settle_ms: 10,
            // Datasheet minimum is 2ms low, 20ms before the first command
            reset_hold_ms: 2,
            reset_settle_ms: 20,
            refresh_settle_ms: 100,
            spi_clock_hz: DEFAULT_SPI_CLOCK_HZ,
        }
    }
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set panel dimensions (required)
    pub fn dimensions(mut self, dims: Dimensions) -> Self {
        self.dimensions = Some(dims);
        self
    }

    /// Set the panel setting mode byte
    pub fn panel_setting(mut self, value: u8) -> Self {
        self.panel_setting = value;
        self
    }

    /// Set the VCOM and data interval byte
    pub fn vcom_data_interval(mut self, value: u8) -> Self {
        self.vcom_data_interval = value;
        self
    }

    /// Set the busy-wait ceiling in milliseconds
    ///
    /// Default is 30,000ms. Set to 0 to wait forever.
    pub fn busy_timeout_ms(mut self, value: u32) -> Self {
        self.busy_timeout_ms = value;
        self
    }

    /// Set the busy line poll interval in milliseconds
    pub fn busy_poll_ms(mut self, value: u32) -> Self {
        self.busy_poll_ms = value;
        self
    }

    /// Set the delay between power-enable and the reset pulse
    pub fn power_settle_ms(mut self, value: u32) -> Self {
        self.power_settle_ms = value;
        self
    }

    /// Set reset hold and settle times in milliseconds
    pub fn reset_timing(mut self, hold_ms: u32, settle_ms: u32) -> Self {
        self.reset_hold_ms = hold_ms;
        self.reset_settle_ms = settle_ms;
        self
    }

    /// Set the settle time after the display-refresh command
    pub fn refresh_settle_ms(mut self, value: u32) -> Self {
        self.refresh_settle_ms = value;
        self
    }

    /// Record the SPI clock the bus was configured with
    pub fn spi_clock_hz(mut self, value: u32) -> Self {
        self.spi_clock_hz = value;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::MissingDimensions` if dimensions were not set and
    /// `BuilderError::InvalidTiming` if the poll interval is zero or the reset
    /// timing is below the controller minimum.
    pub fn build(self) -> Result<Config, BuilderError> {
        let dimensions = self.dimensions.ok_or(BuilderError::MissingDimensions)?;
        if self.busy_poll_ms == 0 || self.reset_hold_ms < 2 || self.reset_settle_ms < 20 {
            return Err(BuilderError::InvalidTiming);
        }
        Ok(Config {
            dimensions,
            panel_setting: self.panel_setting,
            vcom_data_interval: self.vcom_data_interval,
            busy_timeout_ms: self.busy_timeout_ms,
            busy_poll_ms: self.busy_poll_ms,
            power_settle_ms: self.power_settle_ms,
            reset_hold_ms: self.reset_hold_ms,
            reset_settle_ms: self.reset_settle_ms,
            refresh_settle_ms: self.refresh_settle_ms,
            spi_clock_hz: self.spi_clock_hz,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_13in3_sizes() {
        let dims = Dimensions::PANEL_13IN3;
        assert_eq!(dims.buffer_size(), 240_000);
        assert_eq!(dims.half_buffer_size(), 120_000);
        assert_eq!(dims.half_width(), 800);
        assert_eq!(dims.row_bytes(), 200);
    }

    #[test]
    fn test_dimensions_reject_unaligned_halves() {
        assert!(Dimensions::new(1608, 100).is_err());
        assert!(Dimensions::new(24, 100).is_err());
        assert!(Dimensions::new(32, 100).is_ok());
    }

    #[test]
    fn test_dimensions_reject_zero_and_oversize() {
        assert!(Dimensions::new(0, 100).is_err());
        assert!(Dimensions::new(32, 0).is_err());
        assert!(Dimensions::new(1616, 100).is_err());
        assert!(Dimensions::new(32, 1201).is_err());
    }

    #[test]
    fn test_builder_missing_dimensions() {
        let result = Builder::new().build();
        assert!(matches!(result, Err(BuilderError::MissingDimensions)));
    }

    #[test]
    fn test_builder_defaults() {
        let config = Builder::new()
            .dimensions(Dimensions::PANEL_13IN3)
            .build()
            .unwrap();
        assert_eq!(config.busy_timeout_ms, 30_000);
        assert_eq!(config.panel_setting, 0x1F);
        assert_eq!(config.vcom_data_interval, 0x97);
        assert_eq!(config.spi_clock_hz, 4_000_000);
    }

    #[test]
    fn test_builder_rejects_short_reset_timing() {
        let result = Builder::new()
            .dimensions(Dimensions::PANEL_13IN3)
            .reset_timing(1, 20)
            .build();
        assert!(matches!(result, Err(BuilderError::InvalidTiming)));

        let result = Builder::new()
            .dimensions(Dimensions::PANEL_13IN3)
            .busy_poll_ms(0)
            .build();
        assert!(matches!(result, Err(BuilderError::InvalidTiming)));
    }
}
