//! A bounded multi-producer, multi-consumer blocking queue.

use std::{
    collections::VecDeque,
    convert::Infallible,
    fmt,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use tracing::{debug, trace};

use crate::sync::{
    cancel::Interrupt, CancellationToken, InvalidCapacity, PutError, TakeError, TryPutError,
    TryTakeError,
};

/// Upper bound on the number of slots allocated up front.
const PREALLOCATED_SLOTS: usize = 1024;

/// The state change a parked thread is waiting for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Condition {
    NotFull,
    NotEmpty,
}

/// Why a bounded or cancellable wait gave up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum GaveUp {
    Timeout,
    Cancelled,
}

type Items<'a, T> = MutexGuard<'a, VecDeque<T>>;

/// How long a thread is willing to wait for a condition.
trait Patience {
    /// Why the wait ended without the condition holding.
    type GaveUp: fmt::Debug;

    /// Checked before the condition, so it wins over a condition that
    /// already holds.
    fn interrupted(&self) -> Option<Self::GaveUp>;

    /// Parks once, or gives up without parking.
    fn park<'a, T: Send>(
        &self,
        shared: &'a Shared<T>,
        items: Items<'a, T>,
        condition: Condition,
    ) -> Result<Items<'a, T>, (Items<'a, T>, Self::GaveUp)>;
}

/// Waits until the condition holds, however long that takes.
struct Forever;

impl Patience for Forever {
    type GaveUp = Infallible;

    fn interrupted(&self) -> Option<Infallible> {
        None
    }

    fn park<'a, T: Send>(
        &self,
        shared: &'a Shared<T>,
        items: Items<'a, T>,
        condition: Condition,
    ) -> Result<Items<'a, T>, (Items<'a, T>, Infallible)> {
        Ok(shared.park(items, condition))
    }
}

/// Waits until an optional deadline, for as long as an optional token isn't
/// cancelled.
struct Limited<'t> {
    deadline: Option<Instant>,
    token: Option<&'t CancellationToken>,
}

impl<'t> Limited<'t> {
    fn timeout(timeout: Duration) -> Self {
        // A timeout too large to represent means waiting forever.
        Limited {
            deadline: Instant::now().checked_add(timeout),
            token: None,
        }
    }

    fn cancellable(token: &'t CancellationToken) -> Self {
        Limited {
            deadline: None,
            token: Some(token),
        }
    }

    fn with_token(self, token: &'t CancellationToken) -> Self {
        Limited {
            token: Some(token),
            ..self
        }
    }
}

impl Patience for Limited<'_> {
    type GaveUp = GaveUp;

    fn interrupted(&self) -> Option<GaveUp> {
        self.token
            .filter(|token| token.is_cancelled())
            .map(|_| GaveUp::Cancelled)
    }

    fn park<'a, T: Send>(
        &self,
        shared: &'a Shared<T>,
        items: Items<'a, T>,
        condition: Condition,
    ) -> Result<Items<'a, T>, (Items<'a, T>, GaveUp)> {
        let Some(deadline) = self.deadline else {
            return Ok(shared.park(items, condition));
        };
        let now = Instant::now();
        if now >= deadline {
            return Err((items, GaveUp::Timeout));
        }
        trace!(?condition, len = items.len(), "parking with deadline");
        let (items, _) = shared
            .condvar(condition)
            .wait_timeout(items, deadline - now)
            .unwrap_or_else(PoisonError::into_inner);
        Ok(items)
    }
}

/// The state shared by all handles of a queue. The sequence is only ever
/// touched with `items` locked.
struct Shared<T: Send> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T: Send> Shared<T> {
    fn lock(&self) -> Items<'_, T> {
        // Every critical section leaves the sequence consistent, so a
        // poisoned lock still guards a valid queue.
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn condvar(&self, condition: Condition) -> &Condvar {
        match condition {
            Condition::NotFull => &self.not_full,
            Condition::NotEmpty => &self.not_empty,
        }
    }

    fn holds(&self, items: &VecDeque<T>, condition: Condition) -> bool {
        match condition {
            Condition::NotFull => items.len() < self.capacity,
            Condition::NotEmpty => !items.is_empty(),
        }
    }

    /// Parks until notified, releasing the lock while parked.
    fn park<'a>(&'a self, items: Items<'a, T>, condition: Condition) -> Items<'a, T> {
        trace!(?condition, len = items.len(), "parking");
        self.condvar(condition)
            .wait(items)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Parks until `condition` holds or `patience` runs out.
    fn wait_for<'a, P: Patience>(
        &'a self,
        mut items: Items<'a, T>,
        condition: Condition,
        patience: &P,
    ) -> Result<Items<'a, T>, P::GaveUp> {
        loop {
            if let Some(reason) = patience.interrupted() {
                return Err(self.give_up(items, condition, reason));
            }
            if self.holds(&items, condition) {
                return Ok(items);
            }
            items = match patience.park(self, items, condition) {
                Ok(items) => items,
                Err((items, reason)) => return Err(self.give_up(items, condition, reason)),
            };
        }
    }

    /// Abandons a wait. If the condition holds we may have consumed the
    /// notification meant for another waiter, so pass it on.
    fn give_up<R: fmt::Debug>(&self, items: Items<'_, T>, condition: Condition, reason: R) -> R {
        debug!(?condition, ?reason, len = items.len(), "giving up wait");
        if self.holds(&items, condition) {
            self.condvar(condition).notify_one();
        }
        reason
    }

    /// Appends `item` once there's room. The item is handed back if the wait
    /// gives up.
    fn put<P: Patience>(&self, item: T, patience: &P) -> Result<(), (T, P::GaveUp)> {
        match self.wait_for(self.lock(), Condition::NotFull, patience) {
            Ok(mut items) => {
                items.push_back(item);
                self.not_empty.notify_one();
                Ok(())
            }
            Err(reason) => Err((item, reason)),
        }
    }

    fn take<P: Patience>(&self, patience: &P) -> Result<T, P::GaveUp> {
        let mut items = self.lock();
        loop {
            items = self.wait_for(items, Condition::NotEmpty, patience)?;
            if let Some(item) = items.pop_front() {
                self.not_full.notify_one();
                return Ok(item);
            }
        }
    }
}

impl<T: Send> Interrupt for Shared<T> {
    fn interrupt(&self) {
        // Taking the lock orders us after any waiter that checked its token
        // but hasn't parked yet.
        let _items = self.lock();
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

fn put_error<T>((item, reason): (T, GaveUp)) -> PutError<T> {
    match reason {
        GaveUp::Timeout => PutError::Timeout(item),
        GaveUp::Cancelled => PutError::Cancelled(item),
    }
}

fn take_error(reason: GaveUp) -> TakeError {
    match reason {
        GaveUp::Timeout => TakeError::Timeout,
        GaveUp::Cancelled => TakeError::Cancelled,
    }
}

/// A first-in, first-out queue that holds at most `capacity` values.
///
/// [`put`](Self::put) parks the calling thread while the queue is full and
/// [`take`](Self::take) parks it while the queue is empty. Parked threads
/// don't spin: they sleep on a condition variable until another thread
/// changes the state they are waiting on.
///
/// The queue is a handle; clones refer to the same queue, so it can be
/// handed to any number of producer and consumer threads.
///
/// # Examples
///
/// ```
/// use std::thread;
/// use turnstile::sync::blocking::BoundedBlockingQueue;
///
/// let queue = BoundedBlockingQueue::new(1).unwrap();
/// let producer = {
///     let queue = queue.clone();
///     thread::spawn(move || {
///         queue.put("x");
///         queue.put("y"); // Parks until "x" is taken.
///     })
/// };
/// assert_eq!("x", queue.take());
/// assert_eq!("y", queue.take());
/// producer.join().unwrap();
/// ```
pub struct BoundedBlockingQueue<T: Send> {
    shared: Arc<Shared<T>>,
}

impl<T: Send> BoundedBlockingQueue<T> {
    /// Creates a queue that holds at most `capacity` values. Returns an
    /// error if `capacity` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use turnstile::sync::{blocking::BoundedBlockingQueue, InvalidCapacity};
    ///
    /// assert_eq!(5, BoundedBlockingQueue::<u64>::new(5).unwrap().capacity());
    /// assert_eq!(InvalidCapacity, BoundedBlockingQueue::<u64>::new(0).unwrap_err());
    /// ```
    pub fn new(capacity: usize) -> Result<Self, InvalidCapacity> {
        if capacity == 0 {
            return Err(InvalidCapacity);
        }
        Ok(Self::with_capacity(capacity))
    }

    /// Creates a queue whose capacity is `usize::MAX`, so `put` never parks
    /// in practice.
    pub fn unbounded() -> Self {
        Self::with_capacity(usize::MAX)
    }

    fn with_capacity(capacity: usize) -> Self {
        debug!(capacity, "creating blocking queue");
        Self {
            shared: Arc::new(Shared {
                items: Mutex::new(VecDeque::with_capacity(capacity.min(PREALLOCATED_SLOTS))),
                capacity,
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
            }),
        }
    }

    /// Appends a value to the tail of the queue, parking the calling thread
    /// while the queue is full.
    pub fn put(&self, item: T) {
        match self.shared.put(item, &Forever) {
            Ok(()) => {}
            Err((_, never)) => match never {},
        }
    }

    /// Like [`put`](Self::put), but gives up once `timeout` has elapsed,
    /// returning the value in [`PutError::Timeout`].
    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PutError<T>> {
        self.shared
            .put(item, &Limited::timeout(timeout))
            .map_err(put_error)
    }

    /// Like [`put`](Self::put), but gives up when `token` is cancelled,
    /// returning the value in [`PutError::Cancelled`]. The value is never
    /// inserted if the put is cancelled.
    ///
    /// # Examples
    ///
    /// ```
    /// use turnstile::sync::{blocking::BoundedBlockingQueue, CancellationToken, PutError};
    ///
    /// let queue = BoundedBlockingQueue::new(1).unwrap();
    /// let token = CancellationToken::new();
    /// assert_eq!(Ok(()), queue.put_cancellable(1, &token));
    /// token.cancel();
    /// assert_eq!(Err(PutError::Cancelled(2)), queue.put_cancellable(2, &token));
    /// assert_eq!(1, queue.len());
    /// ```
    pub fn put_cancellable(&self, item: T, token: &CancellationToken) -> Result<(), PutError<T>>
    where
        T: 'static,
    {
        let _registration = token.register(self.shared.clone());
        self.shared
            .put(item, &Limited::cancellable(token))
            .map_err(put_error)
    }

    /// Combines [`put_timeout`](Self::put_timeout) and
    /// [`put_cancellable`](Self::put_cancellable).
    pub fn put_timeout_cancellable(
        &self,
        item: T,
        timeout: Duration,
        token: &CancellationToken,
    ) -> Result<(), PutError<T>>
    where
        T: 'static,
    {
        let _registration = token.register(self.shared.clone());
        self.shared
            .put(item, &Limited::timeout(timeout).with_token(token))
            .map_err(put_error)
    }

    /// Attempts to append a value without waiting. Returns an error holding
    /// the value if the queue is full.
    pub fn try_put(&self, item: T) -> Result<(), TryPutError<T>> {
        let shared = &*self.shared;
        let mut items = shared.lock();
        if items.len() == shared.capacity {
            return Err(TryPutError::Full(item));
        }
        items.push_back(item);
        shared.not_empty.notify_one();
        Ok(())
    }

    /// Removes the value at the head of the queue, parking the calling
    /// thread while the queue is empty.
    pub fn take(&self) -> T {
        match self.shared.take(&Forever) {
            Ok(item) => item,
            Err(never) => match never {},
        }
    }

    /// Like [`take`](Self::take), but gives up with [`TakeError::Timeout`]
    /// once `timeout` has elapsed.
    pub fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError> {
        self.shared
            .take(&Limited::timeout(timeout))
            .map_err(take_error)
    }

    /// Like [`take`](Self::take), but gives up with [`TakeError::Cancelled`]
    /// when `token` is cancelled. No value is removed if the take is
    /// cancelled.
    pub fn take_cancellable(&self, token: &CancellationToken) -> Result<T, TakeError>
    where
        T: 'static,
    {
        let _registration = token.register(self.shared.clone());
        self.shared
            .take(&Limited::cancellable(token))
            .map_err(take_error)
    }

    /// Combines [`take_timeout`](Self::take_timeout) and
    /// [`take_cancellable`](Self::take_cancellable).
    pub fn take_timeout_cancellable(
        &self,
        timeout: Duration,
        token: &CancellationToken,
    ) -> Result<T, TakeError>
    where
        T: 'static,
    {
        let _registration = token.register(self.shared.clone());
        self.shared
            .take(&Limited::timeout(timeout).with_token(token))
            .map_err(take_error)
    }

    /// Attempts to remove the value at the head of the queue without
    /// waiting.
    pub fn try_take(&self) -> Result<T, TryTakeError> {
        let shared = &*self.shared;
        let mut items = shared.lock();
        let item = items.pop_front().ok_or(TryTakeError::Empty)?;
        shared.not_full.notify_one();
        Ok(item)
    }

    /// Returns the number of values in the queue. The answer may be stale as
    /// soon as it's returned.
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }

    /// Returns true if the queue is full.
    pub fn is_full(&self) -> bool {
        self.shared.lock().len() == self.shared.capacity
    }

    /// Returns the capacity of the queue.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Returns how many values can be put before the queue becomes full.
    pub fn remaining_capacity(&self) -> usize {
        self.shared.capacity - self.shared.lock().len()
    }
}

impl<T: Send> Clone for BoundedBlockingQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send> Default for BoundedBlockingQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T: Send> fmt::Debug for BoundedBlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedBlockingQueue")
            .field("capacity", &self.shared.capacity)
            .field("len", &self.len())
            .finish()
    }
}
