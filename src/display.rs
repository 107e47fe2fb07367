//! Panel state machine
//!
//! [`Display`] sequences every panel operation across the two controllers:
//! reset, controller bring-up, frame load, refresh and deep sleep. Each step
//! addresses the master first and the slave second, never both at once.
//!
//! Busy-waits are bounded by the configured ceiling (30s by default). A
//! controller that is still busy at the ceiling is logged and the sequence
//! carries on; the timeout is counted and visible through
//! [`Display::busy_timeouts`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use duo_epd::{Builder, Dimensions, Display, PanelBus};
//! # use core::convert::Infallible;
//! # use embedded_hal::delay::DelayNs;
//! # use duo_epd::Controller;
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
//! # struct MockDelay;
//! # impl DelayNs for MockDelay { fn delay_ns(&mut self, _ns: u32) {} }
//! # let mut delay = MockDelay;
//! let config = match Builder::new().dimensions(Dimensions::PANEL_13IN3).build() {
//!     Ok(config) => config,
//!     Err(_) => return,
//! };
//! let mut display = Display::new(Bus, config);
//! let _ = display.begin();
//!
//! let frame = vec![0xFFu8; Dimensions::PANEL_13IN3.buffer_size()];
//! let _ = display.display_bitmap(&frame, &mut delay);
//! ```

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::command::{
    DEEP_SLEEP, DEEP_SLEEP_CHECK, DISPLAY_REFRESH, PANEL_SETTING, PANEL_SETTING_SOFT_RESET,
    POWER_OFF, POWER_ON, RESOLUTION_SETTING, START_TRANSMISSION, VCOM_DATA_INTERVAL, WHITE_BYTE,
    resolution_bytes,
};
use crate::config::{Config, Dimensions};
use crate::error::Error;
use crate::interface::{Controller, PanelBus};
use crate::wait::{BoundedWait, WaitOutcome};

type DisplayResult<I> = core::result::Result<(), Error<I>>;

/// Bytes clocked per data transaction when filling a half-frame
const FILL_CHUNK: usize = 256;

/// Lifecycle of the panel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PanelState {
    /// [`Display::begin`] has not run
    #[default]
    Uninitialized,
    /// Control lines at idle levels, panel unpowered
    PoweredDown,
    /// Power applied and reset pulsed
    Resetting,
    /// Both controllers programmed
    ControllersConfigured,
    /// Ready for a frame load or refresh
    Idle,
    /// Streaming a frame or refreshing
    Busy,
    /// Both controllers in deep sleep, power removed
    Sleeping,
}

/// Driver for the dual-controller panel
///
/// Every operation takes `&mut self`, so at most one display operation is
/// ever in flight for a given panel.
pub struct Display<I>
where
    I: PanelBus,
{
    /// Hardware interface
    interface: I,
    /// Display configuration
    config: Config,
    /// Current lifecycle state
    state: PanelState,
    /// Busy-waits that hit the ceiling since creation
    busy_timeouts: u32,
    /// Completed refresh cycles since creation
    refreshes: u32,
}

impl<I> Display<I>
where
    I: PanelBus,
{
    /// Create a new Display instance
    pub fn new(interface: I, config: Config) -> Self {
        Self {
            interface,
            config,
            state: PanelState::Uninitialized,
            busy_timeouts: 0,
            refreshes: 0,
        }
    }

    /// Drive the control lines to idle and leave the panel powered down
    pub fn begin(&mut self) -> DisplayResult<I> {
        self.interface.begin().map_err(Error::Interface)?;
        info!(
            "panel {}x{} on bus at {} Hz",
            self.config.dimensions.width, self.config.dimensions.height, self.config.spi_clock_hz
        );
        self.state = PanelState::PoweredDown;
        Ok(())
    }

    /// Power the panel and pulse the reset line
    pub fn reset<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.require_started()?;
        self.interface.set_power(true).map_err(Error::Interface)?;
        delay.delay_ms(self.config.power_settle_ms);
        self.interface
            .reset(delay, self.config.reset_hold_ms, self.config.reset_settle_ms)
            .map_err(Error::Interface)?;
        self.state = PanelState::Resetting;
        Ok(())
    }

    /// Poll the busy line until the controllers are idle or the ceiling passes
    ///
    /// Hitting the ceiling is not an error: it is logged, counted, and the
    /// caller proceeds as if the controller were idle.
    pub fn wait_until_idle<D: DelayNs>(&mut self, delay: &mut D) -> Result<WaitOutcome, Error<I>> {
        let wait = BoundedWait::new(self.config.busy_timeout_ms, self.config.busy_poll_ms);
        let interface = &mut self.interface;
        let outcome = wait
            .poll(delay, || interface.is_busy())
            .map_err(Error::Interface)?;
        if let WaitOutcome::TimedOut { waited_ms } = outcome {
            self.busy_timeouts = self.busy_timeouts.saturating_add(1);
            warn!("panel still busy after {waited_ms} ms, continuing");
        }
        Ok(outcome)
    }

    /// Reset the panel and program both controllers
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.reset(delay)?;
        self.wait_until_idle(delay)?;

        let dims = self.config.dimensions;
        let resolution = resolution_bytes(dims.half_width(), dims.height);
        for controller in Controller::ALL {
            self.send(controller, PANEL_SETTING, &[PANEL_SETTING_SOFT_RESET])?;
            self.send(controller, PANEL_SETTING, &[self.config.panel_setting])?;
            self.send(controller, RESOLUTION_SETTING, &resolution)?;
            self.send(controller, VCOM_DATA_INTERVAL, &[self.config.vcom_data_interval])?;
        }
        self.state = PanelState::ControllersConfigured;
        debug!("controllers configured");

        self.state = PanelState::Idle;
        Ok(())
    }

    /// Fill both halves with white and refresh
    ///
    /// A sleeping or powered-down panel is brought up first. The panel is left
    /// awake; call [`sleep`](Self::sleep) to end the cycle.
    pub fn clear<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.require_started()?;
        if !matches!(
            self.state,
            PanelState::Idle | PanelState::ControllersConfigured
        ) {
            self.init(delay)?;
        }

        self.state = PanelState::Busy;
        let half = self.config.dimensions.half_buffer_size();
        for controller in Controller::ALL {
            self.send_command(controller, START_TRANSMISSION)?;
            self.fill(controller, WHITE_BYTE, half)?;
        }
        self.refresh(delay)
    }

    /// Power on both controllers and drive the loaded frame onto the panel
    pub fn refresh<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.require_started()?;
        self.state = PanelState::Busy;

        for controller in Controller::ALL {
            self.send_command(controller, POWER_ON)?;
            self.wait_until_idle(delay)?;
        }
        for controller in Controller::ALL {
            self.send_command(controller, DISPLAY_REFRESH)?;
        }
        delay.delay_ms(self.config.refresh_settle_ms);
        self.wait_until_idle(delay)?;

        self.refreshes = self.refreshes.saturating_add(1);
        self.state = PanelState::Idle;
        Ok(())
    }

    /// Power off both controllers, put them in deep sleep and cut panel power
    pub fn sleep<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.require_started()?;

        for controller in Controller::ALL {
            self.send_command(controller, POWER_OFF)?;
            self.wait_until_idle(delay)?;
        }
        for controller in Controller::ALL {
            self.send(controller, DEEP_SLEEP, &[DEEP_SLEEP_CHECK])?;
        }
        self.interface.set_power(false).map_err(Error::Interface)?;

        self.state = PanelState::Sleeping;
        debug!("panel asleep");
        Ok(())
    }

    /// Show a full frame: init, load both halves, refresh, sleep
    ///
    /// The frame is split at its midpoint; the first half goes to the master,
    /// the second to the slave. The length is not checked against the panel
    /// size here; use [`PanelFrame`](crate::PanelFrame) or the
    /// [`ImagePipeline`](crate::ImagePipeline) to validate it first.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyFrame` without touching the bus for an empty
    /// frame. A bus error mid-sequence leaves the panel in an indeterminate
    /// visual state; call this again or [`clear`](Self::clear) to recover.
    pub fn display_bitmap<D: DelayNs>(&mut self, frame: &[u8], delay: &mut D) -> DisplayResult<I> {
        if frame.is_empty() {
            warn!("refusing to display an empty frame");
            return Err(Error::EmptyFrame);
        }
        self.require_started()?;

        self.init(delay)?;

        let (left, right) = frame.split_at(frame.len() / 2);
        self.state = PanelState::Busy;
        self.send(Controller::Master, START_TRANSMISSION, left)?;
        self.send(Controller::Slave, START_TRANSMISSION, right)?;
        debug!("frame loaded: {} + {} bytes", left.len(), right.len());

        self.refresh(delay)?;
        self.sleep(delay)
    }

    /// Placeholder for text output
    ///
    /// Text rendering is not supported. The message is logged and the panel is
    /// cleared to white and put to sleep.
    pub fn display_text<D: DelayNs>(&mut self, message: &str, delay: &mut D) -> DisplayResult<I> {
        info!("text output not rendered, clearing panel: {message}");
        self.require_started()?;
        self.init(delay)?;
        self.clear(delay)?;
        self.sleep(delay)
    }

    /// Current lifecycle state
    pub fn state(&self) -> PanelState {
        self.state
    }

    /// Number of busy-waits that hit the ceiling
    pub fn busy_timeouts(&self) -> u32 {
        self.busy_timeouts
    }

    /// Number of completed refresh cycles
    pub fn refreshes(&self) -> u32 {
        self.refreshes
    }

    /// Get panel dimensions
    pub fn dimensions(&self) -> &Dimensions {
        &self.config.dimensions
    }

    /// Access the underlying configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Access the underlying bus
    pub fn interface(&self) -> &I {
        &self.interface
    }

    /// Release the underlying bus
    pub fn release(self) -> I {
        self.interface
    }

    fn require_started(&self) -> DisplayResult<I> {
        if self.state == PanelState::Uninitialized {
            return Err(Error::NotStarted);
        }
        Ok(())
    }

    /// Send a command followed by its parameters to one controller
    fn send(&mut self, controller: Controller, command: u8, data: &[u8]) -> DisplayResult<I> {
        self.send_command(controller, command)?;
        self.interface
            .send_data(controller, data)
            .map_err(Error::Interface)
    }

    fn send_command(&mut self, controller: Controller, command: u8) -> DisplayResult<I> {
        self.interface
            .send_command(controller, command)
            .map_err(Error::Interface)
    }

    fn fill(&mut self, controller: Controller, value: u8, len: usize) -> DisplayResult<I> {
        let chunk = [value; FILL_CHUNK];
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(FILL_CHUNK);
            self.interface
                .send_data(controller, &chunk[..n])
                .map_err(Error::Interface)?;
            remaining -= n;
        }
        Ok(())
    }
}
