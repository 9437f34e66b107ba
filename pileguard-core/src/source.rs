//! Event sources
//!
//! The pipeline reads events through the `EventSource` trait: a known
//! length plus access by position. Sources must return events in ascending
//! timestamp order; drift calibration sweeps forward through time windows
//! and never backtracks.
//!
//! ## Access Pattern
//!
//! Every pass is a single sequential scan from index 0, so implementations
//! backed by large files should buffer reads for forward access.
//! `MemoryEventSource` serves slices for tests and replay.

use crate::event::{Event, Timestamp};

/// Ordered, randomly accessible event records
pub trait EventSource {
    /// Total number of events
    fn len(&self) -> usize;

    /// Event at `index`, `None` past the end
    fn get(&self, index: usize) -> Option<Event>;

    /// Check if the source has no events
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timestamp of the first event
    fn first_timestamp(&self) -> Option<Timestamp> {
        self.get(0).map(|event| event.timestamp)
    }

    /// Timestamp of the last event
    fn last_timestamp(&self) -> Option<Timestamp> {
        self.len()
            .checked_sub(1)
            .and_then(|index| self.get(index))
            .map(|event| event.timestamp)
    }

    /// Sequential iterator from the first event
    fn iter(&self) -> SourceIter<'_, Self> {
        SourceIter {
            source: self,
            position: 0,
        }
    }
}

/// Forward iterator over an `EventSource`
pub struct SourceIter<'a, S: ?Sized> {
    source: &'a S,
    position: usize,
}

impl<'a, S: EventSource + ?Sized> Iterator for SourceIter<'a, S> {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.source.get(self.position)?;
        self.position += 1;
        Some(event)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.source.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

/// Slice-backed source for tests and replay
///
/// ```rust
/// use pileguard_core::{Event, EventSource, MemoryEventSource};
///
/// let events = vec![
///     Event::new(100, 0, 16000.0, 3200.0),
///     Event::new(250, 0, 8000.0, 1600.0),
/// ];
/// let source = MemoryEventSource::new(&events);
///
/// assert_eq!(source.len(), 2);
/// assert_eq!(source.last_timestamp(), Some(250));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MemoryEventSource<'a> {
    events: &'a [Event],
}

impl<'a> MemoryEventSource<'a> {
    /// Wrap a slice of events
    pub fn new(events: &'a [Event]) -> Self {
        Self { events }
    }

    /// Underlying events
    pub fn events(&self) -> &'a [Event] {
        self.events
    }
}

impl<'a> EventSource for MemoryEventSource<'a> {
    fn len(&self) -> usize {
        self.events.len()
    }

    fn get(&self, index: usize) -> Option<Event> {
        self.events.get(index).copied()
    }
}
