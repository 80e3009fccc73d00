//! Producer/consumer tests for the bounded channel.
//!
//! Observations are taken inside the `*_inspect` callbacks, which run under
//! the channel's guard, so recorded sequences reflect the real order of
//! operations on the buffer.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, Once};
use std::thread;
use std::time::Duration;

use serial_test::serial;

use concord::Pacing;
use concord::channel::{BoundedChannel, ChannelConfig, RecvError};

static INIT_TRACING: Once = Once::new();

fn init_test_tracing() {
    INIT_TRACING.call_once(|| {
        concord::init_tracing();
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Produce(u64),
    Consume(u64),
}

#[test]
fn fifo_single_producer_single_consumer() {
    let channel = BoundedChannel::new(5).unwrap();
    let mut consumed = Vec::new();

    for item in 0..=5u64 {
        channel.produce(item).unwrap();
        consumed.push(channel.consume().unwrap());
    }

    assert_eq!(consumed, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn fifo_across_threads() {
    init_test_tracing();

    let channel = BoundedChannel::new(5).unwrap();
    let consumed = thread::scope(|s| {
        s.spawn(|| {
            for item in 0..1_000u64 {
                channel.produce(item).unwrap();
            }
        });
        (0..1_000)
            .map(|_| channel.consume().unwrap())
            .collect::<Vec<_>>()
    });

    assert_eq!(consumed, (0..1_000).collect::<Vec<_>>());
}

#[test]
fn counts_sum_to_capacity_when_quiescent() {
    let channel = BoundedChannel::new(5).unwrap();
    let check = |channel: &BoundedChannel<u64>| {
        assert_eq!(channel.available() + channel.occupied(), channel.capacity());
    };

    check(&channel);
    for i in 0..5 {
        channel.produce(i).unwrap();
        check(&channel);
    }
    assert_eq!(channel.available(), 0);

    for _ in 0..3 {
        channel.consume().unwrap();
        check(&channel);
    }
    channel.produce(10).unwrap();
    check(&channel);
    assert_eq!(channel.occupied(), 3);
}

#[test]
#[serial]
fn multi_producer_conservation() {
    init_test_tracing();

    let config = ChannelConfig {
        produce: Pacing::Uniform {
            min: Duration::ZERO,
            max: Duration::from_micros(300),
        },
        consume: Pacing::Uniform {
            min: Duration::ZERO,
            max: Duration::from_micros(500),
        },
        ..ChannelConfig::default()
    };
    let channel = Arc::new(BoundedChannel::new(config.capacity).unwrap());

    let consumers: Vec<_> = (0..config.consumers)
        .map(|_| {
            let channel = Arc::clone(&channel);
            let pacing = config.consume;
            thread::spawn(move || {
                let mut received = Vec::new();
                while let Ok(item) = channel.consume() {
                    received.push(item);
                    pacing.pause();
                }
                received
            })
        })
        .collect();

    let producers: Vec<_> = (0..config.producers)
        .map(|id| {
            let channel = Arc::clone(&channel);
            let pacing = config.produce;
            let items = config.items_per_producer;
            thread::spawn(move || {
                for sequence in 0..items {
                    pacing.pause();
                    channel.produce(ChannelConfig::item(id, sequence)).unwrap();
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    channel.close();

    let received: Vec<u64> = consumers
        .into_iter()
        .flat_map(|c| c.join().unwrap())
        .collect();
    let unique: HashSet<u64> = received.iter().copied().collect();
    let expected: HashSet<u64> = (0..config.producers)
        .flat_map(|id| (0..config.items_per_producer).map(move |s| ChannelConfig::item(id, s)))
        .collect();

    assert_eq!(received.len() as u64, config.total_items(), "duplicates or drops");
    assert_eq!(unique, expected);
    assert_eq!(channel.occupied(), 0);
    assert_eq!(channel.available(), config.capacity);
}

#[test]
#[serial]
fn each_producers_items_stay_in_order() {
    init_test_tracing();

    let channel = BoundedChannel::new(3).unwrap();
    let consumed = thread::scope(|s| {
        for id in 0..4 {
            let channel = &channel;
            s.spawn(move || {
                for sequence in 0..50 {
                    channel.produce(ChannelConfig::item(id, sequence)).unwrap();
                }
            });
        }
        (0..200)
            .map(|_| channel.consume().unwrap())
            .collect::<Vec<_>>()
    });

    for id in 0..4u64 {
        let mine: Vec<u64> = consumed.iter().copied().filter(|i| i / 100 == id).collect();
        let expected: Vec<u64> = (0..50).map(|s| id * 100 + s).collect();
        assert_eq!(mine, expected, "producer {id}");
    }
}

#[test]
#[serial]
fn no_overrun_or_underrun_under_contention() {
    init_test_tracing();

    const CAPACITY: usize = 4;
    let channel = BoundedChannel::new(CAPACITY).unwrap();

    thread::scope(|s| {
        for id in 0..3 {
            let channel = &channel;
            s.spawn(move || {
                for sequence in 0..100 {
                    channel
                        .produce_inspect(ChannelConfig::item(id, sequence), |slot, view| {
                            assert!(view.occupied() >= 1 && view.occupied() <= CAPACITY);
                            assert!(view.slots().nth(slot).flatten().is_some());
                        })
                        .unwrap();
                }
            });
        }
        for _ in 0..3 {
            let channel = &channel;
            s.spawn(move || {
                for _ in 0..100 {
                    channel
                        .consume_inspect(|slot, _, view| {
                            assert!(view.occupied() < CAPACITY);
                            assert!(view.slots().nth(slot).flatten().is_none());
                        })
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(channel.occupied(), 0);
    assert_eq!(channel.available(), CAPACITY);
}

#[test]
#[serial]
fn capacity_one_forces_alternation() {
    init_test_tracing();

    let channel = BoundedChannel::new(1).unwrap();
    let log = Mutex::new(Vec::new());

    thread::scope(|s| {
        s.spawn(|| {
            for item in 0..100u64 {
                channel
                    .produce_inspect(item, |_, _| log.lock().unwrap().push(Op::Produce(item)))
                    .unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..100 {
                channel
                    .consume_inspect(|_, item, _| log.lock().unwrap().push(Op::Consume(*item)))
                    .unwrap();
            }
        });
    });

    let log = log.into_inner().unwrap();
    assert_eq!(log.len(), 200);
    for (i, pair) in log.chunks(2).enumerate() {
        let item = i as u64;
        assert_eq!(pair, [Op::Produce(item), Op::Consume(item)]);
    }
}

#[test]
fn close_releases_idle_consumers() {
    let channel = Arc::new(BoundedChannel::<u64>::new(5).unwrap());

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.consume())
        })
        .collect();

    channel.produce(7).unwrap();
    thread::sleep(Duration::from_millis(20));
    channel.close();

    let mut results: Vec<_> = consumers.into_iter().map(|c| c.join().unwrap()).collect();
    results.sort_by_key(Result::is_err);
    assert_eq!(
        results,
        vec![Ok(7), Err(RecvError::Closed), Err(RecvError::Closed)]
    );
}
