use crossbeam::queue::ArrayQueue;
use std::sync::Arc;

/// A bounded, lock-free, multi-producer multi-consumer ring buffer.
///
/// Sits between the router (producer, on the event-processing path) and a
/// stream's flush task (consumer). A full buffer hands the item back to
/// the producer instead of blocking, so `send` on a queue-backed sink never
/// waits on the OLAP store.
pub struct RingBuffer<T> {
    inner: Arc<ArrayQueue<T>>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with the given capacity.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be > 0");
        Self {
            inner: Arc::new(ArrayQueue::new(capacity)),
            capacity,
        }
    }

    /// Try to push an item into the buffer.
    ///
    /// Returns `Err(item)` if the buffer is full (backpressure signal).
    pub fn try_push(&self, item: T) -> Result<(), T> {
        self.inner.push(item)
    }

    /// Try to pop an item from the buffer.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.pop()
    }

    /// Pop up to `max` items into `out`, returning how many were moved.
    pub fn drain_into(&self, out: &mut Vec<T>, max: usize) -> usize {
        let mut moved = 0;
        while moved < max {
            match self.inner.pop() {
                Some(item) => {
                    out.push(item);
                    moved += 1;
                }
                None => break,
            }
        }
        moved
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the current fill ratio (0.0–1.0).
    pub fn fill_ratio(&self) -> f64 {
        self.inner.len() as f64 / self.capacity as f64
    }
}

impl<T> Clone for RingBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            capacity: self.capacity,
        }
    }
}
