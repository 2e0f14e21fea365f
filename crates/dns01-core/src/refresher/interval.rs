//! Wall-clock schedule for the token refresher
//!
//! The first tick fires after the startup delay, then one tick per period.
//! A tick that falls due while the previous refresh is still running is
//! delayed, never bunched up.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::{Stream, StreamExt};

use crate::config::RefresherConfig;
use crate::error::{Error, Result};
use crate::traits::{Tick, TickSource};

/// Fixed-period schedule with an initial delay
#[derive(Debug, Clone, Copy)]
pub struct IntervalTicks {
    startup_delay: Duration,
    period: Duration,
}

impl IntervalTicks {
    /// Create a schedule
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `period` is zero.
    pub fn new(startup_delay: Duration, period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::config("Refresh period must be > 0"));
        }
        Ok(Self {
            startup_delay,
            period,
        })
    }

    /// Create a schedule from refresher configuration
    pub fn from_config(config: &RefresherConfig) -> Result<Self> {
        Self::new(config.startup_delay(), config.interval())
    }

    /// Delay before the first tick
    pub fn startup_delay(&self) -> Duration {
        self.startup_delay
    }

    /// Period between ticks
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl TickSource for IntervalTicks {
    fn ticks(&self) -> Pin<Box<dyn Stream<Item = Tick> + Send + 'static>> {
        let start = Instant::now() + self.startup_delay;
        let mut interval = tokio::time::interval_at(start, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut seq = 0u64;
        let stream = IntervalStream::new(interval).map(move |_| {
            seq += 1;
            Tick::new(seq)
        });

        Box::pin(stream)
    }
}
