//! Blocking queues.
//!
//! Producers park while a queue is full and consumers park while it is
//! empty. Every queue is guarded by a single lock with two conditions, one
//! signalled when a slot frees up and one signalled when a value arrives.

mod bounded;
mod ext;

pub use self::bounded::BoundedBlockingQueue;
pub use self::ext::Drain;

use crate::sync::InvalidCapacity;

/// Creates a blocking queue that holds at most `capacity` values.
pub fn bounded<T: Send>(capacity: usize) -> Result<BoundedBlockingQueue<T>, InvalidCapacity> {
    BoundedBlockingQueue::new(capacity)
}

/// Creates a blocking queue with an effectively unlimited capacity.
pub fn unbounded<T: Send>() -> BoundedBlockingQueue<T> {
    BoundedBlockingQueue::unbounded()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_agree() {
        assert_eq!(3, bounded::<u8>(3).unwrap().capacity());
        assert_eq!(Err(InvalidCapacity), bounded::<u8>(0).map(|q| q.capacity()));
        assert_eq!(usize::MAX, unbounded::<u8>().capacity());
    }
}
