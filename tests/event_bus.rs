use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use rstest::rstest;
use topica::{
    ErrorExt, LockingEventBus, MessageSubscriber, PublicationError, PublishSummary,
    StandardEventBus, StatusCode, SubscriberId, Subscription, Topic,
};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Bark(u32),
    Meow,
    Tick(u64),
}

/// Records which handler saw which message, in order.
#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<(String, Event)>>>);

impl Journal {
    fn handler(
        &self,
        label: &str,
    ) -> impl Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static {
        let entries = Arc::clone(&self.0);
        let label = label.to_string();
        move |event: &Event| {
            entries.lock().unwrap().push((label.clone(), event.clone()));
            Ok(())
        }
    }

    fn labels(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(l, _)| l.clone()).collect()
    }

    fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

struct Zoo {
    animal: Topic,
    dog: Topic,
    cat: Topic,
}

fn zoo() -> Zoo {
    let animal = Topic::root("Animal");
    let dog = animal.subtopic("Dog");
    let cat = animal.subtopic("Cat");
    Zoo { animal, dog, cat }
}

#[test]
fn test_dog_publisher_tracks_animal_and_dog_subscriptions() {
    let zoo = zoo();
    let journal = Journal::default();
    let owner = SubscriberId::new();
    let mut bus = StandardEventBus::new();

    let s1 = bus.subscribe(&zoo.animal, owner, None, journal.handler("S1"));
    let animal_publisher = bus.get_publisher(&zoo.animal);
    let dog_publisher = bus.get_publisher(&zoo.dog);
    assert_eq!(dog_publisher.subscriptions(), vec![s1.clone()]);

    let s2 = bus.subscribe(&zoo.dog, owner, None, journal.handler("S2"));
    assert_eq!(dog_publisher.subscriptions(), vec![s1.clone(), s2]);

    // the supertopic publisher is untouched
    assert!(bus.find_publisher(&zoo.animal).unwrap().ptr_eq(&animal_publisher));
    assert_eq!(animal_publisher.subscriptions(), vec![s1]);

    let summary = dog_publisher.publish(&Event::Bark(1));
    assert_eq!(summary, PublishSummary { delivered: 2, failed: 0 });
    assert_eq!(journal.labels(), vec!["S1", "S2"]);
}

#[test]
fn test_delivery_follows_subscription_order() {
    let topic = Topic::root("Queue");
    let journal = Journal::default();
    let mut bus = StandardEventBus::new();
    let owner = SubscriberId::new();

    let labels: Vec<String> = (0..6).map(|i| format!("h{i}")).collect();
    let subscriptions: Vec<_> = labels
        .iter()
        .map(|label| Subscription::new(&topic, owner, None, journal.handler(label)))
        .collect();
    // registration order differs from creation order
    for subscription in subscriptions.iter().rev() {
        bus.add_subscription(subscription.clone());
    }

    bus.publish(&topic, &Event::Tick(1));
    assert_eq!(journal.labels(), labels);
}

#[test]
fn test_publish_without_subscribers_is_noop() {
    let mut bus: StandardEventBus<Event> = StandardEventBus::new();
    let summary = bus.publish(&Topic::root("Void"), &Event::Meow);
    assert!(summary.is_clean());
    assert_eq!(summary.total(), 0);
}

#[test]
fn test_once_subscription_fires_once() {
    let event = Topic::root("Event");
    let journal = Journal::default();
    let mut bus = StandardEventBus::new();
    let once = bus.once(&event, SubscriberId::new(), journal.handler("once"));

    bus.publish(&event, &Event::Tick(1));
    assert!(!bus.find_subscriptions_for_topic(&event).contains(&once));
    bus.publish(&event, &Event::Tick(2));

    assert_eq!(journal.len(), 1);
}

#[test]
fn test_once_is_not_reentered_by_nested_publish() {
    let event = Topic::root("Event");
    let bus: LockingEventBus<Event> = LockingEventBus::new();
    let calls = Arc::new(Mutex::new(0));
    {
        let bus_inside = bus.clone();
        let event_inside = event.clone();
        let calls = Arc::clone(&calls);
        bus.once(&event, SubscriberId::new(), move |_: &Event| {
            *calls.lock().unwrap() += 1;
            bus_inside.publish(&event_inside, &Event::Meow);
            Ok(())
        });
    }

    bus.publish(&event, &Event::Meow);
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[test]
fn test_failing_handler_is_isolated_and_reported() {
    let topic = Topic::root("Orders");
    let reports: Arc<Mutex<Vec<(u64, String, StatusCode)>>> = Arc::default();
    let journal = Journal::default();
    let mut bus = {
        let reports = Arc::clone(&reports);
        StandardEventBus::builder()
            .failure_handler(move |err: &PublicationError<Event>| {
                reports.lock().unwrap().push((
                    err.subscription().id().get(),
                    err.cause().to_string(),
                    err.status_code(),
                ));
            })
            .build()
    };

    let failing = bus.on(&topic, |_: &Event| Err(anyhow!("out of stock")));
    bus.on(&topic, journal.handler("ok"));

    let summary = bus.publish(&topic, &Event::Tick(9));
    assert_eq!(summary, PublishSummary { delivered: 1, failed: 1 });
    assert_eq!(journal.labels(), vec!["ok"]);
    assert_eq!(
        *reports.lock().unwrap(),
        vec![(failing.id().get(), "out of stock".to_string(), StatusCode::DeliveryFailed)]
    );
}

#[test]
fn test_builder_subscription_through_bus() {
    let zoo = zoo();
    let seen: Arc<Mutex<Vec<u32>>> = Arc::default();
    let mut bus = StandardEventBus::new();
    let subscription = {
        let seen = Arc::clone(&seen);
        Subscription::builder(&zoo.animal, SubscriberId::new())
            .filter_topic({
                let dog = zoo.dog.clone();
                move |topic| *topic == dog
            })
            .filter_mapped(|event: &Event| match event {
                Event::Bark(volume) => Some(*volume),
                _ => None,
            })
            .filter_message(|volume| *volume > 2)
            .build(move |volume: &u32| {
                seen.lock().unwrap().push(*volume);
                Ok(())
            })
    };
    assert!(bus.add_subscription(subscription));

    bus.publish(&zoo.cat, &Event::Bark(10));
    bus.publish(&zoo.dog, &Event::Meow);
    bus.publish(&zoo.dog, &Event::Bark(1));
    bus.publish(&zoo.dog, &Event::Bark(5));

    assert_eq!(*seen.lock().unwrap(), vec![5]);
}

#[rstest]
#[case::exact("Animal", true)]
#[case::child("Dog", true)]
#[case::other_root("Plant", false)]
fn test_hierarchy_matching(
    #[case] published: &str,
    #[case] delivered: bool,
) {
    let zoo = zoo();
    let plant = Topic::root("Plant");
    let topic = match published {
        "Animal" => &zoo.animal,
        "Dog" => &zoo.dog,
        _ => &plant,
    };
    let journal = Journal::default();
    let mut bus = StandardEventBus::new();
    bus.on(&zoo.animal, journal.handler("animal"));

    bus.publish(topic, &Event::Meow);
    assert_eq!(journal.len() == 1, delivered);
}

#[test]
fn test_multiple_parents() {
    let pet = Topic::root("Pet");
    let animal = Topic::root("Animal");
    let dog = Topic::with_parents("Dog", &[&animal, &pet]);
    let journal = Journal::default();
    let mut bus = StandardEventBus::new();
    bus.on(&pet, journal.handler("pet"));
    bus.on(&animal, journal.handler("animal"));

    bus.publish(&dog, &Event::Bark(3));
    assert_eq!(journal.labels(), vec!["pet", "animal"]);
}

struct Kennel {
    id: SubscriberId,
    dog: Topic,
    cat: Topic,
    journal: Journal,
}

impl MessageSubscriber<Event> for Kennel {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn subscriptions(&self) -> Vec<Subscription<Event>> {
        vec![
            Subscription::new(&self.dog, self.id, None, self.journal.handler("dog")),
            Subscription::new(&self.cat, self.id, None, self.journal.handler("cat")),
        ]
    }
}

#[test]
fn test_subscriber_teardown_removes_everything() {
    let zoo = zoo();
    let kennel = Kennel {
        id: SubscriberId::new(),
        dog: zoo.dog.clone(),
        cat: zoo.cat.clone(),
        journal: Journal::default(),
    };
    let bus: LockingEventBus<Event> = LockingEventBus::new();
    let dog_publisher = bus.get_publisher(&zoo.dog);

    assert_eq!(bus.register_subscriber(&kennel).len(), 2);
    assert_eq!(dog_publisher.len(), 1);
    bus.publish(&zoo.cat, &Event::Meow);

    assert_eq!(bus.unregister_subscriber(&kennel).len(), 2);
    assert!(dog_publisher.is_empty());
    bus.publish(&zoo.dog, &Event::Bark(2));

    assert_eq!(kennel.journal.labels(), vec!["cat"]);
    assert_eq!(bus.subscription_count(), 0);
}

#[test]
fn test_dispose_unknown_and_duplicate_are_not_errors() {
    let topic = Topic::root("Once");
    let mut bus: StandardEventBus<Event> = StandardEventBus::new();
    assert!(!bus.dispose_publisher(&topic));

    let subscription = bus.on(&topic, |_: &Event| Ok(()));
    assert!(!bus.add_subscription(subscription.clone()));
    assert!(bus.remove_subscription(&subscription));
    assert!(!bus.remove_subscription(&subscription));
}
