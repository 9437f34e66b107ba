//! Detector event records
//!
//! One `Event` per digitized pulse: a timestamp in digitizer ticks, the
//! channel it came from and two charge integrals (whole pulse and tail).
//! Events are never mutated once read from a source.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timestamp in digitizer clock ticks
pub type Timestamp = u64;

/// Single digitized pulse
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// Trigger time in clock ticks
    pub timestamp: Timestamp,
    /// Digitizer channel
    pub channel: i32,
    /// Integrated charge of the whole pulse (ADC units)
    pub total_integral: f64,
    /// Integrated charge of the pulse tail (ADC units)
    pub tail_integral: f64,
}

impl Event {
    /// Create an event
    pub const fn new(
        timestamp: Timestamp,
        channel: i32,
        total_integral: f64,
        tail_integral: f64,
    ) -> Self {
        Self {
            timestamp,
            channel,
            total_integral,
            tail_integral,
        }
    }

    /// Tail-to-total ratio
    ///
    /// `None` when the total integral is zero or either integral is not a
    /// finite number; such events carry no pulse-shape information.
    pub fn ratio(&self) -> Option<f64> {
        if self.total_integral == 0.0
            || !self.total_integral.is_finite()
            || !self.tail_integral.is_finite()
        {
            return None;
        }
        Some(self.tail_integral / self.total_integral)
    }
}
