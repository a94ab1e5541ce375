//! Sliding-window median tracker
//!
//! [`Mediator`] keeps the last `W` samples in a circular queue and splits them
//! between a max-heap (lower half) and a min-heap (upper half). Each heap entry
//! is a slot index into the queue, and every slot records where it sits in the
//! heaps, so the oldest sample can be overwritten in place and re-sifted.
//! Insert/evict costs O(log W); reading the median is O(1).
//!
//! # Example
//!
//! ```
//! use stratum_ffa::preprocessing::running_median::Mediator;
//!
//! let mut mediator = Mediator::new(3)?;
//! for x in [5.0, 1.0, 3.0, 9.0] {
//!     mediator.insert(x);
//! }
//! // Window now holds [1, 3, 9]
//! assert_eq!(mediator.median(), Some(3.0));
//! # Ok::<(), stratum_ffa::SearchError>(())
//! ```

use crate::error::SearchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Half {
    /// Max-heap holding the smaller values
    Lower,
    /// Min-heap holding the larger values
    Upper,
}

/// Running median over a fixed-size trailing window
#[derive(Debug, Clone)]
pub struct Mediator {
    /// Circular queue of window values
    values: Vec<f64>,
    /// Which heap each queue slot lives in
    half: Vec<Half>,
    /// Index of each queue slot inside its heap
    pos: Vec<usize>,
    /// Max-heap of slot indices
    lower: Vec<usize>,
    /// Min-heap of slot indices
    upper: Vec<usize>,
    /// Next slot to write (the oldest once the window is full)
    next: usize,
    /// Window capacity
    window: usize,
}

impl Mediator {
    /// Create a tracker for a window of `window` samples
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidInput` if `window` is zero
    pub fn new(window: usize) -> Result<Self, SearchError> {
        if window == 0 {
            return Err(SearchError::InvalidInput(
                "Median window must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            values: Vec::with_capacity(window),
            half: Vec::with_capacity(window),
            pos: Vec::with_capacity(window),
            lower: Vec::with_capacity(window / 2 + 1),
            upper: Vec::with_capacity(window / 2 + 1),
            next: 0,
            window,
        })
    }

    /// Window capacity
    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.lower.len() + self.upper.len()
    }

    /// True before the first insert
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once the window holds `window` samples
    pub fn is_full(&self) -> bool {
        self.len() == self.window()
    }

    /// Push a sample, evicting the oldest one if the window is full
    pub fn insert(&mut self, value: f64) {
        if self.is_full() {
            self.replace_oldest(value);
        } else {
            self.append(value);
        }
        self.next = (self.next + 1) % self.window();
    }

    /// Median of the held samples
    ///
    /// The top of the larger heap for an odd count, the mean of both tops for an
    /// even count, `None` when empty.
    pub fn median(&self) -> Option<f64> {
        let low = self.lower.first().map(|&slot| self.values[slot]);
        let high = self.upper.first().map(|&slot| self.values[slot]);

        match self.lower.len().cmp(&self.upper.len()) {
            std::cmp::Ordering::Greater => low,
            std::cmp::Ordering::Less => high,
            std::cmp::Ordering::Equal => match (low, high) {
                (Some(a), Some(b)) => Some((a + b) / 2.0),
                _ => None,
            },
        }
    }

    /// Filling phase: a new slot joins one heap, then the halves are rebalanced
    fn append(&mut self, value: f64) {
        let slot = self.values.len();
        self.values.push(value);

        let side = match self.lower.first() {
            Some(&top) if value > self.values[top] => Half::Upper,
            _ => Half::Lower,
        };
        let index = self.heap(side).len();
        self.half.push(side);
        self.pos.push(index);
        self.heap_mut(side).push(slot);
        self.sift_up(side, index);

        if self.lower.len() > self.upper.len() + 1 {
            self.move_top(Half::Lower);
        } else if self.upper.len() > self.lower.len() + 1 {
            self.move_top(Half::Upper);
        }
    }

    /// Full phase: overwrite the oldest slot and restore both heap orders
    fn replace_oldest(&mut self, value: f64) {
        let slot = self.next;
        self.values[slot] = value;

        let side = self.half[slot];
        let start = self.pos[slot];
        let index = self.sift_up(side, start);
        self.sift_down(side, index);

        // One element changed, so at most one pair of tops is out of order
        if let (Some(&low), Some(&high)) = (self.lower.first(), self.upper.first()) {
            if self.values[low] > self.values[high] {
                self.lower[0] = high;
                self.upper[0] = low;
                self.half[high] = Half::Lower;
                self.half[low] = Half::Upper;
                self.pos[high] = 0;
                self.pos[low] = 0;
                self.sift_down(Half::Lower, 0);
                self.sift_down(Half::Upper, 0);
            }
        }
    }

    /// Pop the top of `from` and push it onto the other heap
    fn move_top(&mut self, from: Half) {
        let to = match from {
            Half::Lower => Half::Upper,
            Half::Upper => Half::Lower,
        };

        let last = self.heap(from).len() - 1;
        self.swap(from, 0, last);
        let slot = match self.heap_mut(from).pop() {
            Some(slot) => slot,
            None => return,
        };
        if !self.heap(from).is_empty() {
            self.sift_down(from, 0);
        }

        let index = self.heap(to).len();
        self.half[slot] = to;
        self.pos[slot] = index;
        self.heap_mut(to).push(slot);
        self.sift_up(to, index);
    }

    fn heap(&self, side: Half) -> &Vec<usize> {
        match side {
            Half::Lower => &self.lower,
            Half::Upper => &self.upper,
        }
    }

    fn heap_mut(&mut self, side: Half) -> &mut Vec<usize> {
        match side {
            Half::Lower => &mut self.lower,
            Half::Upper => &mut self.upper,
        }
    }

    /// True if heap entry `a` belongs above entry `b`
    fn outranks(&self, side: Half, a: usize, b: usize) -> bool {
        let heap = self.heap(side);
        let (va, vb) = (self.values[heap[a]], self.values[heap[b]]);
        match side {
            Half::Lower => va > vb,
            Half::Upper => va < vb,
        }
    }

    fn swap(&mut self, side: Half, a: usize, b: usize) {
        self.heap_mut(side).swap(a, b);
        let heap = self.heap(side);
        let (slot_a, slot_b) = (heap[a], heap[b]);
        self.pos[slot_a] = a;
        self.pos[slot_b] = b;
    }

    /// Returns the final index of the moved entry
    fn sift_up(&mut self, side: Half, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.outranks(side, index, parent) {
                break;
            }
            self.swap(side, index, parent);
            index = parent;
        }
        index
    }

    fn sift_down(&mut self, side: Half, mut index: usize) {
        let len = self.heap(side).len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut best = index;
            if left < len && self.outranks(side, left, best) {
                best = left;
            }
            if right < len && self.outranks(side, right, best) {
                best = right;
            }
            if best == index {
                break;
            }
            self.swap(side, index, best);
            index = best;
        }
    }
}

/// Trailing running median of `input`
///
/// Element `i` is the median of `input[i + 1 - window ..= i]`; near the start,
/// where fewer than `window` samples exist, it is the median of everything seen
/// so far.
///
/// # Errors
///
/// Returns `SearchError::InvalidInput` if `window` is zero
pub fn running_median(input: &[f64], window: usize) -> Result<Vec<f64>, SearchError> {
    let mut mediator = Mediator::new(window)?;
    let mut output = Vec::with_capacity(input.len());

    for &x in input {
        mediator.insert(x);
        // The mediator is non-empty after an insert
        output.push(mediator.median().unwrap_or(x));
    }

    Ok(output)
}
