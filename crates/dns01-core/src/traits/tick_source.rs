// # Tick Source Trait
//
// Decouples the token refresher from wall-clock timers.
//
// ## Implementations
//
// - [`crate::refresher::IntervalTicks`]: startup delay, then a fixed period
// - Tests: channel-backed sources that tick on demand
//
// The refresher owns no timer of its own; whoever composes the process
// decides when ticks happen and for how long the stream lives.

use std::pin::Pin;
use tokio_stream::Stream;

/// One scheduled refresh opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Sequence number, starting at 1
    pub seq: u64,
}

impl Tick {
    /// Create a tick with the given sequence number
    pub fn new(seq: u64) -> Self {
        Self { seq }
    }
}

/// Trait for schedule implementations
pub trait TickSource: Send + Sync {
    /// Start the schedule
    ///
    /// The returned stream yields one item per scheduled run. It ends only
    /// if the schedule itself ends; production schedules never end.
    fn ticks(&self) -> Pin<Box<dyn Stream<Item = Tick> + Send + 'static>>;
}
