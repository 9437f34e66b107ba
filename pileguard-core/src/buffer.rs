//! Trailing window of the most recent values
//!
//! The envelope smoothing walks the accepted columns left to right and needs
//! the last `N` raw cut values at each step. `CircularBuffer` keeps them in a
//! fixed array, so the walk never allocates and never looks back into the
//! envelope itself.
//!
//! ```text
//! N = 5, after pushing a..g:
//!
//!   slots  [ f | g | c | d | e ]
//!                  ↑ head (oldest)
//!   window  c d e f g
//! ```
//!
//! A push into a full buffer replaces the oldest value.
//!
//! ```rust
//! use pileguard_core::buffer::CircularBuffer;
//!
//! let mut window: CircularBuffer<f64, 3> = CircularBuffer::new();
//! for value in [1.0, 2.0, 3.0, 4.0] {
//!     window.push(value);
//! }
//! assert!(window.is_full());
//! assert_eq!(window.oldest_first().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
//! assert_eq!(window.mean(), Some(3.0));
//! ```

/// Fixed-capacity ring of `N` values
///
/// `head` is the slot of the oldest value once the ring is full; before that
/// the values occupy `slots[..len]` in push order.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T, const N: usize> {
    slots: [T; N],
    head: usize,
    len: usize,
}

impl<T: Copy + Default, const N: usize> CircularBuffer<T, N> {
    /// Empty ring
    pub fn new() -> Self {
        Self {
            slots: [T::default(); N],
            head: 0,
            len: 0,
        }
    }

    /// Append `value`, dropping the oldest when full
    ///
    /// A zero-capacity ring stores nothing.
    pub fn push(&mut self, value: T) {
        if N == 0 {
            return;
        }
        if self.len < N {
            self.slots[self.len] = value;
            self.len += 1;
        } else {
            self.slots[self.head] = value;
            self.head = (self.head + 1) % N;
        }
    }

    /// Stored values
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if nothing was pushed yet
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if a complete window is available
    pub fn is_full(&self) -> bool {
        N > 0 && self.len == N
    }

    /// Most recent value
    pub fn newest(&self) -> Option<T> {
        match self.len {
            0 => None,
            len if len < N => Some(self.slots[len - 1]),
            _ => Some(self.slots[(self.head + N - 1) % N]),
        }
    }

    /// Values from oldest to newest
    pub fn oldest_first(&self) -> impl Iterator<Item = T> + '_ {
        let (wrapped, start) = self.slots[..self.len].split_at(self.head);
        start.iter().chain(wrapped).copied()
    }

    /// Forget every value
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl<const N: usize> CircularBuffer<f64, N> {
    /// Mean of the stored values, `None` when empty
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.oldest_first().sum::<f64>() / self.len as f64)
    }
}

impl<T: Copy + Default, const N: usize> Default for CircularBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let ring: CircularBuffer<f64, 5> = CircularBuffer::new();
        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert_eq!(ring.newest(), None);
        assert_eq!(ring.mean(), None);
        assert_eq!(ring.oldest_first().count(), 0);
    }

    #[test]
    fn partial_window_keeps_push_order() {
        let mut ring = CircularBuffer::<f64, 5>::new();
        for value in [0.3, 0.1, 0.2] {
            ring.push(value);
        }
        assert_eq!(ring.len(), 3);
        assert!(!ring.is_full());
        assert_eq!(ring.newest(), Some(0.2));
        assert_eq!(ring.oldest_first().collect::<Vec<_>>(), vec![0.3, 0.1, 0.2]);
    }

    #[test]
    fn wraps_after_capacity() {
        let mut ring = CircularBuffer::<u32, 3>::new();
        for value in 1..=7 {
            ring.push(value);
        }
        assert!(ring.is_full());
        assert_eq!(ring.newest(), Some(7));
        assert_eq!(ring.oldest_first().collect::<Vec<_>>(), vec![5, 6, 7]);
    }

    #[test]
    fn mean_tracks_the_window() {
        let mut ring = CircularBuffer::<f64, 4>::new();
        for value in [2.0, 4.0, 6.0, 8.0] {
            ring.push(value);
        }
        assert_eq!(ring.mean(), Some(5.0));
        ring.push(10.0);
        assert_eq!(ring.mean(), Some(7.0));
    }

    #[test]
    fn clear_and_zero_capacity() {
        let mut ring = CircularBuffer::<f64, 2>::new();
        ring.push(1.0);
        ring.clear();
        assert!(ring.is_empty());

        let mut none = CircularBuffer::<f64, 0>::new();
        none.push(1.0);
        assert!(none.is_empty());
        assert!(!none.is_full());
    }
}
