//! Time-bounded polling
//!
//! Both the controller busy line and the Wi-Fi station connect are waited on
//! by polling a condition at a fixed interval until it clears or a ceiling is
//! reached. [`BoundedWait`] captures that loop once, with the elapsed time
//! measured in poll intervals so a mock [`DelayNs`] fully controls it in tests.
//!
//! ## Example
//!
//! ```
//! use core::convert::Infallible;
//! use duo_epd::wait::{BoundedWait, WaitOutcome};
//! # use embedded_hal::delay::DelayNs;
//! # struct NoDelay;
//! # impl DelayNs for NoDelay { fn delay_ns(&mut self, _ns: u32) {} }
//!
//! let wait = BoundedWait::new(100, 10);
//! let mut polls = 0;
//! let outcome = wait.poll(&mut NoDelay, || {
//!     polls += 1;
//!     Ok::<_, Infallible>(polls < 3)
//! });
//! assert_eq!(outcome, Ok(WaitOutcome::Ready { waited_ms: 20 }));
//! ```

use embedded_hal::delay::DelayNs;

/// How a bounded wait ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The condition cleared
    Ready {
        /// Time spent waiting in milliseconds
        waited_ms: u32,
    },
    /// The ceiling was reached with the condition still pending
    TimedOut {
        /// Time spent waiting in milliseconds
        waited_ms: u32,
    },
}

impl WaitOutcome {
    /// Whether the ceiling was reached
    pub fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Time spent waiting in milliseconds
    pub fn waited_ms(&self) -> u32 {
        match *self {
            Self::Ready { waited_ms } | Self::TimedOut { waited_ms } => waited_ms,
        }
    }
}

/// A polling loop with a fixed interval and ceiling
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundedWait {
    /// Ceiling in milliseconds, 0 waits forever
    pub ceiling_ms: u32,
    /// Delay between polls in milliseconds
    pub interval_ms: u32,
}

impl BoundedWait {
    /// Create a new bounded wait
    ///
    /// An `interval_ms` of zero is treated as 1ms.
    pub const fn new(ceiling_ms: u32, interval_ms: u32) -> Self {
        Self {
            ceiling_ms,
            interval_ms: if interval_ms == 0 { 1 } else { interval_ms },
        }
    }

    /// Poll `pending` until it returns `false` or the ceiling is reached
    ///
    /// `pending` is sampled before each delay, so a condition that is already
    /// clear returns immediately without delaying. The condition is sampled
    /// at most `ceiling_ms / interval_ms + 1` times.
    pub fn poll<D, E, F>(&self, delay: &mut D, mut pending: F) -> Result<WaitOutcome, E>
    where
        D: DelayNs,
        F: FnMut() -> Result<bool, E>,
    {
        let mut waited_ms = 0u32;
        loop {
            if !pending()? {
                return Ok(WaitOutcome::Ready { waited_ms });
            }
            if self.ceiling_ms > 0 && waited_ms >= self.ceiling_ms {
                return Ok(WaitOutcome::TimedOut { waited_ms });
            }
            delay.delay_ms(self.interval_ms);
            waited_ms = waited_ms.saturating_add(self.interval_ms);
        }
    }
}
