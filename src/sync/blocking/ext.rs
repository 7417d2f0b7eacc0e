//! Bulk removal built on top of the non-blocking take.

use super::BoundedBlockingQueue;

/// Moves values out of a queue in bulk, without waiting.
///
/// Each value is removed with its own non-blocking take, so values put
/// concurrently may or may not be drained, and the drained values are not
/// a snapshot of the queue at any one instant.
pub trait Drain<T> {
    /// Moves up to `limit` values from the head of the queue into `out`, in
    /// FIFO order. Returns how many values were moved.
    ///
    /// # Examples
    ///
    /// ```
    /// use turnstile::sync::blocking::{BoundedBlockingQueue, Drain};
    /// let queue = BoundedBlockingQueue::new(4).unwrap();
    /// queue.put(1);
    /// queue.put(2);
    /// queue.put(3);
    /// let mut out = Vec::new();
    /// assert_eq!(2, queue.drain_into(&mut out, 2));
    /// assert_eq!(vec![1, 2], out);
    /// ```
    fn drain_into<E: Extend<T>>(&self, out: &mut E, limit: usize) -> usize;

    /// Moves every value currently in the queue into `out`.
    fn drain_all<E: Extend<T>>(&self, out: &mut E) -> usize {
        self.drain_into(out, usize::MAX)
    }

    /// Drops every value currently in the queue, returning how many there
    /// were.
    fn clear(&self) -> usize {
        struct Discard;
        impl<T> Extend<T> for Discard {
            fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
                iter.into_iter().for_each(drop);
            }
        }
        self.drain_all(&mut Discard)
    }
}

impl<T: Send> Drain<T> for BoundedBlockingQueue<T> {
    fn drain_into<E: Extend<T>>(&self, out: &mut E, limit: usize) -> usize {
        let mut drained = 0;
        while drained < limit {
            match self.try_take() {
                Ok(item) => out.extend(Some(item)),
                Err(_) => break,
            }
            drained += 1;
        }
        drained
    }
}
