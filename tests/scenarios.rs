use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use turnstile::sync::{
    blocking::{bounded, unbounded, BoundedBlockingQueue},
    CancellationToken, InvalidCapacity, TakeError,
};

#[test]
fn zero_capacity_is_rejected() {
    assert!(matches!(bounded::<String>(0), Err(InvalidCapacity)));
}

#[test]
fn unbounded_accepts_ten_thousand_puts() {
    let queue = unbounded();
    for i in 0..10_000u32 {
        queue.put(i);
    }
    assert_eq!(10_000, queue.len());
}

#[test]
fn capacity_one_hand_off() {
    let queue = bounded(1).unwrap();
    let second_put_done = Arc::new(AtomicBool::new(false));
    let producer = {
        let queue = queue.clone();
        let second_put_done = second_put_done.clone();
        thread::spawn(move || {
            queue.put("x");
            queue.put("y");
            second_put_done.store(true, Ordering::SeqCst);
        })
    };
    thread::sleep(Duration::from_millis(100));
    assert!(!second_put_done.load(Ordering::SeqCst));
    assert_eq!("x", queue.take());
    assert_eq!("y", queue.take());
    producer.join().unwrap();
    assert!(second_put_done.load(Ordering::SeqCst));
}

#[test]
fn producers_and_consumers_hand_off_every_item_once() {
    const PRODUCERS: usize = 3;
    const CONSUMERS: usize = 3;
    const PER_PRODUCER: usize = 100;

    let queue: BoundedBlockingQueue<Option<(usize, usize)>> = bounded(10).unwrap();
    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Some(item) = queue.take() {
                    seen.push(item);
                }
                seen
            })
        })
        .collect();
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = queue.clone();
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    queue.put(Some((producer, seq)));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    for _ in 0..CONSUMERS {
        queue.put(None);
    }

    let mut all = HashSet::new();
    let mut total = 0;
    for consumer in consumers {
        let seen = consumer.join().unwrap();
        // Each consumer observes a given producer's items in insertion order.
        let mut last = [None; PRODUCERS];
        for &(producer, seq) in &seen {
            assert!(last[producer].map_or(true, |prev| prev < seq));
            last[producer] = Some(seq);
        }
        total += seen.len();
        all.extend(seen);
    }
    assert_eq!(PRODUCERS * PER_PRODUCER, total);
    assert_eq!(PRODUCERS * PER_PRODUCER, all.len());
    assert!(queue.is_empty());
}

#[test]
fn cancelled_consumers_leave_the_queue_usable() {
    let queue = bounded::<u32>(2).unwrap();
    let token = CancellationToken::new();
    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let queue = queue.clone();
            let token = token.clone();
            thread::spawn(move || queue.take_cancellable(&token))
        })
        .collect();
    thread::sleep(Duration::from_millis(100));
    token.cancel();
    for consumer in consumers {
        assert_eq!(Err(TakeError::Cancelled), consumer.join().unwrap());
    }
    queue.put(1);
    queue.put(2);
    assert_eq!(1, queue.take());
    assert_eq!(2, queue.take());
}
