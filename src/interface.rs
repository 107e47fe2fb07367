//! Hardware interface abstraction
//!
//! This module provides the [`PanelBus`] trait and the [`Interface`] struct
//! for talking to the two panel controllers over one shared SPI bus.
//!
//! ## Hardware Requirements
//!
//! The panel requires:
//! - SPI bus (MOSI + SCK), shared by both controllers
//! - 2 chip-select pins, one per controller (output, active low)
//! - 4 more GPIO pins:
//!   - **DC**: Data/Command select (output)
//!   - **RST**: Reset (output, active low)
//!   - **PWR**: Panel power enable (output, active high)
//!   - **BUSY**: Busy status (input, active low by default)
//!
//! Chip-selects are driven by hand rather than through an `SpiDevice`, since
//! a transaction must address exactly one controller and the two are never
//! selected together.
//!
//! ## Example
//!
//! ```rust,no_run
//! use duo_epd::{ChipSelects, Controller, Interface, PanelBus};
//! # use core::convert::Infallible;
//! # use embedded_hal::digital::{InputPin, OutputPin};
//! # use embedded_hal::spi::SpiBus;
//! # struct MockSpi;
//! # impl embedded_hal::spi::ErrorType for MockSpi { type Error = Infallible; }
//! # impl SpiBus for MockSpi {
//! #     fn read(&mut self, _: &mut [u8]) -> Result<(), Infallible> { Ok(()) }
//! #     fn write(&mut self, _: &[u8]) -> Result<(), Infallible> { Ok(()) }
//! #     fn transfer(&mut self, _: &mut [u8], _: &[u8]) -> Result<(), Infallible> { Ok(()) }
//! #     fn transfer_in_place(&mut self, _: &mut [u8]) -> Result<(), Infallible> { Ok(()) }
//! #     fn flush(&mut self) -> Result<(), Infallible> { Ok(()) }
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
//! let chip_selects = ChipSelects { master: MockPin, slave: MockPin };
//! let mut interface = Interface::new(MockSpi, chip_selects, MockPin, MockPin, MockPin, MockPin);
//!
//! let _ = interface.begin();
//! // Panel setting on the master controller only
//! let _ = interface.send_command(Controller::Master, 0x00);
//! let _ = interface.send_data(Controller::Master, &[0x1F]);
//! ```

use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;

type InterfaceResult<T, E> = core::result::Result<T, E>;

/// One of the two controller ICs
///
/// The master drives the left half of the panel, the slave the right half.
/// Every protocol step addresses the master first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Controller {
    /// Left half
    Master,
    /// Right half
    Slave,
}

impl Controller {
    /// Both controllers in protocol order
    pub const ALL: [Self; 2] = [Self::Master, Self::Slave];
}

/// Trait for the shared bus in front of both controllers
///
/// This trait abstracts over different hardware implementations, allowing
/// the [`Display`](crate::display::Display) to work with any SPI + GPIO
/// implementation that satisfies embedded-hal traits.
///
/// ## Implementing
///
/// For most cases, use the provided [`Interface`] struct. Implementations must
/// never assert both chip-selects at the same time.
pub trait PanelBus {
    /// Error type for interface operations
    ///
    /// Must implement [`Debug`] for error reporting.
    type Error: Debug;

    /// Drive chip-selects, reset and power-enable to their idle levels
    fn begin(&mut self) -> InterfaceResult<(), Self::Error>;

    /// Send a command byte to one controller
    ///
    /// The implementation must:
    /// 1. Set DC pin low (command mode)
    /// 2. Assert the controller's chip-select
    /// 3. Send the command byte over SPI
    /// 4. Deassert the chip-select
    #[allow(clippy::type_complexity)]
    fn send_command(&mut self, controller: Controller, command: u8)
    -> InterfaceResult<(), Self::Error>;

    /// Send data bytes to one controller
    ///
    /// Same as [`send_command`](Self::send_command) with DC high. The whole
    /// slice is clocked under one chip-select assertion.
    #[allow(clippy::type_complexity)]
    fn send_data(&mut self, controller: Controller, data: &[u8])
    -> InterfaceResult<(), Self::Error>;

    /// Switch panel power on or off
    fn set_power(&mut self, on: bool) -> InterfaceResult<(), Self::Error>;

    /// Pulse the shared reset line
    ///
    /// The implementation must hold RST low for `hold_ms`, release it, then
    /// wait `settle_ms`.
    fn reset<D: DelayNs>(
        &mut self,
        delay: &mut D,
        hold_ms: u32,
        settle_ms: u32,
    ) -> InterfaceResult<(), Self::Error>;

    /// Sample the busy line
    ///
    /// Returns `true` while a controller is still processing a command.
    fn is_busy(&mut self) -> InterfaceResult<bool, Self::Error>;
}

/// Errors that can occur at the interface level
///
/// Generic over SPI and GPIO error types.
#[derive(Debug)]
pub enum InterfaceError<SpiErr, PinErr> {
    /// SPI communication error
    Spi(SpiErr),
    /// GPIO pin error
    Pin(PinErr),
}

impl<SpiErr: Debug, PinErr: Debug> core::fmt::Display for InterfaceError<SpiErr, PinErr> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Spi(e) => write!(f, "SPI error: {e:?}"),
            Self::Pin(e) => write!(f, "Pin error: {e:?}"),
        }
    }
}

impl<SpiErr: Debug, PinErr: Debug> core::error::Error for InterfaceError<SpiErr, PinErr> {}

/// Chip-select pins of the two controllers
pub struct ChipSelects<CS> {
    /// Master (left half) chip-select
    pub master: CS,
    /// Slave (right half) chip-select
    pub slave: CS,
}

/// Hardware interface implementation for the dual-controller panel
///
/// Implements [`PanelBus`] for embedded-hal v1.0 SPI bus and GPIO traits.
///
/// ## Type Parameters
///
/// * `SPI` - SPI bus implementing [`SpiBus`], clock already configured
/// * `CS` - Chip-select pins implementing [`OutputPin`]
/// * `DC` - Data/Command pin implementing [`OutputPin`]
/// * `RST` - Reset pin implementing [`OutputPin`]
/// * `PWR` - Power enable pin implementing [`OutputPin`]
/// * `BUSY` - Busy pin implementing [`InputPin`]
pub struct Interface<SPI, CS, DC, RST, PWR, BUSY> {
    /// Shared SPI bus
    spi: SPI,
    /// Per-controller chip-selects (active low)
    cs: ChipSelects<CS>,
    /// Data/Command select pin (low=command, high=data)
    dc: DC,
    /// Reset pin (active low)
    rst: RST,
    /// Power enable pin (active high)
    pwr: PWR,
    /// Busy pin
    busy: BUSY,
    /// Busy pin polarity (true = active low)
    busy_active_low: bool,
}

impl<SPI, CS, DC, RST, PWR, BUSY> Interface<SPI, CS, DC, RST, PWR, BUSY>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    PWR: OutputPin,
    BUSY: InputPin,
{
    /// Create a new Interface
    ///
    /// Pins are not touched until [`PanelBus::begin`] is called.
    pub fn new(spi: SPI, cs: ChipSelects<CS>, dc: DC, rst: RST, pwr: PWR, busy: BUSY) -> Self {
        Self {
            spi,
            cs,
            dc,
            rst,
            pwr,
            busy,
            busy_active_low: true,
        }
    }

    /// Set busy pin polarity
    ///
    /// Default is active-low. Set to false for active-high panels.
    pub fn set_busy_active_low(&mut self, active_low: bool) -> &mut Self {
        self.busy_active_low = active_low;
        self
    }

    /// Get busy pin polarity (true = active low)
    pub fn busy_active_low(&self) -> bool {
        self.busy_active_low
    }

    /// Release the bus and pins
    pub fn release(self) -> (SPI, ChipSelects<CS>, DC, RST, PWR, BUSY) {
        (self.spi, self.cs, self.dc, self.rst, self.pwr, self.busy)
    }
}

impl<SPI, CS, DC, RST, PWR, BUSY, PinErr> Interface<SPI, CS, DC, RST, PWR, BUSY>
where
    SPI: SpiBus,
    SPI::Error: Debug,
    CS: OutputPin<Error = PinErr>,
    DC: OutputPin<Error = PinErr>,
    PinErr: Debug,
{
    fn transfer(
        &mut self,
        controller: Controller,
        data_mode: bool,
        bytes: &[u8],
    ) -> InterfaceResult<(), InterfaceError<SPI::Error, PinErr>> {
        if data_mode {
            self.dc.set_high().map_err(InterfaceError::Pin)?;
        } else {
            self.dc.set_low().map_err(InterfaceError::Pin)?;
        }

        let cs = match controller {
            Controller::Master => &mut self.cs.master,
            Controller::Slave => &mut self.cs.slave,
        };
        cs.set_low().map_err(InterfaceError::Pin)?;
        let written = self
            .spi
            .write(bytes)
            .and_then(|()| self.spi.flush())
            .map_err(InterfaceError::Spi);
        // Release the controller even when the write failed
        cs.set_high().map_err(InterfaceError::Pin)?;
        written
    }
}

impl<SPI, CS, DC, RST, PWR, BUSY, PinErr> PanelBus for Interface<SPI, CS, DC, RST, PWR, BUSY>
where
    SPI: SpiBus,
    SPI::Error: Debug,
    CS: OutputPin<Error = PinErr>,
    DC: OutputPin<Error = PinErr>,
    RST: OutputPin<Error = PinErr>,
    PWR: OutputPin<Error = PinErr>,
    BUSY: InputPin<Error = PinErr>,
    PinErr: Debug,
{
    type Error = InterfaceError<SPI::Error, PinErr>;

    fn begin(&mut self) -> InterfaceResult<(), Self::Error> {
        self.cs.master.set_high().map_err(InterfaceError::Pin)?;
        self.cs.slave.set_high().map_err(InterfaceError::Pin)?;
        self.rst.set_high().map_err(InterfaceError::Pin)?;
        self.pwr.set_low().map_err(InterfaceError::Pin)?;
        Ok(())
    }

    fn send_command(
        &mut self,
        controller: Controller,
        command: u8,
    ) -> InterfaceResult<(), Self::Error> {
        self.transfer(controller, false, &[command])
    }

    fn send_data(&mut self, controller: Controller, data: &[u8]) -> InterfaceResult<(), Self::Error> {
        self.transfer(controller, true, data)
    }

    fn set_power(&mut self, on: bool) -> InterfaceResult<(), Self::Error> {
        if on {
            self.pwr.set_high().map_err(InterfaceError::Pin)
        } else {
            self.pwr.set_low().map_err(InterfaceError::Pin)
        }
    }

    fn reset<D: DelayNs>(
        &mut self,
        delay: &mut D,
        hold_ms: u32,
        settle_ms: u32,
    ) -> InterfaceResult<(), Self::Error> {
        // Reset sequence: LOW -> hold -> HIGH -> settle
        self.rst.set_low().map_err(InterfaceError::Pin)?;
        delay.delay_ms(hold_ms);
        self.rst.set_high().map_err(InterfaceError::Pin)?;
        delay.delay_ms(settle_ms);
        Ok(())
    }

    fn is_busy(&mut self) -> InterfaceResult<bool, Self::Error> {
        let level = if self.busy_active_low {
            self.busy.is_low()
        } else {
            self.busy.is_high()
        };
        level.map_err(InterfaceError::Pin)
    }
}
