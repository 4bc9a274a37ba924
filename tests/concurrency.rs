use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
};

use topica::{LockingEventBus, SubscriberId, Subscription, Topic};

/// Publishing threads
const PUBLISHERS: usize = 8;

/// Messages per publishing thread
const MESSAGES: usize = 500;

fn counting(count: &Arc<AtomicUsize>) -> impl Fn(&usize) -> anyhow::Result<()> + Send + Sync + 'static {
    let count = Arc::clone(count);
    move |_: &usize| {
        count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_once_delivered_exactly_once_under_contention() {
    for _ in 0..20 {
        let bus: LockingEventBus<usize> = LockingEventBus::new();
        let topic = Topic::root("Race");
        let calls = Arc::new(AtomicUsize::new(0));
        bus.once(&topic, SubscriberId::new(), counting(&calls));

        let barrier = Arc::new(Barrier::new(PUBLISHERS));
        let handles: Vec<_> = (0..PUBLISHERS)
            .map(|i| {
                let bus = bus.clone();
                let topic = topic.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    bus.publish(&topic, &i);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscription_count(), 0);
    }
}

#[test]
fn test_concurrent_publish_reaches_every_subscriber() {
    let bus: LockingEventBus<usize> = LockingEventBus::new();
    let animal = Topic::root("Animal");
    let dog = animal.subtopic("Dog");
    let on_animal = Arc::new(AtomicUsize::new(0));
    let on_dog = Arc::new(AtomicUsize::new(0));
    bus.on(&animal, counting(&on_animal));
    bus.on(&dog, counting(&on_dog));

    let barrier = Arc::new(Barrier::new(PUBLISHERS));
    let handles: Vec<_> = (0..PUBLISHERS)
        .map(|_| {
            let bus = bus.clone();
            let dog = dog.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for n in 0..MESSAGES {
                    assert_eq!(bus.publish(&dog, &n).delivered, 2);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(on_animal.load(Ordering::SeqCst), PUBLISHERS * MESSAGES);
    assert_eq!(on_dog.load(Ordering::SeqCst), PUBLISHERS * MESSAGES);
    assert_eq!(bus.publisher_count(), 1);
}

#[test]
fn test_subscribe_churn_while_publishing() {
    let bus: LockingEventBus<usize> = LockingEventBus::new();
    let topic = Topic::root("Churn");
    let stable = Arc::new(AtomicUsize::new(0));
    bus.on(&topic, counting(&stable));

    let barrier = Arc::new(Barrier::new(3));
    let churner = {
        let bus = bus.clone();
        let topic = topic.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let owner = SubscriberId::new();
            barrier.wait();
            for _ in 0..MESSAGES {
                let subscription = Subscription::new(&topic, owner, None, |_: &usize| Ok(()));
                assert!(bus.add_subscription(subscription.clone()));
                assert!(bus.remove_subscription(&subscription));
            }
        })
    };
    let publishers: Vec<_> = (0..2)
        .map(|_| {
            let bus = bus.clone();
            let topic = topic.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for n in 0..MESSAGES {
                    let summary = bus.publish(&topic, &n);
                    // stable subscriber plus at most one churned one
                    assert!((1..=2).contains(&summary.delivered));
                }
            })
        })
        .collect();

    churner.join().unwrap();
    for handle in publishers {
        handle.join().unwrap();
    }

    assert_eq!(stable.load(Ordering::SeqCst), 2 * MESSAGES);
    assert_eq!(bus.subscription_count(), 1);
    assert_eq!(bus.get_publisher(&topic).len(), 1);
}

#[test]
fn test_concurrent_publisher_creation_yields_one_entry() {
    let bus: LockingEventBus<usize> = LockingEventBus::new();
    let topic = Topic::root("Lazy");
    bus.on(&topic, |_: &usize| Ok(()));

    let barrier = Arc::new(Barrier::new(PUBLISHERS));
    let handles: Vec<_> = (0..PUBLISHERS)
        .map(|_| {
            let bus = bus.clone();
            let topic = topic.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                bus.get_publisher(&topic)
            })
        })
        .collect();
    let publishers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(publishers.windows(2).all(|pair| pair[0].ptr_eq(&pair[1])));
    assert_eq!(bus.publisher_count(), 1);
}
