//! Producers and consumers over a [`BoundedChannel`].
//!
//! Usage:
//!     cargo run --bin bounded_channel
//!
//! Capacity 5, two producers sending ten items each, three consumers. Each
//! handoff prints the buffer as it looks right after the operation.
//!
//! Consumers never learn that producers are done: once every producer has
//! finished, `main` returns and the consumer threads die with the process.

use std::sync::Arc;
use std::thread;

use minstant::Instant;

use concord::channel::{BoundedChannel, ChannelConfig, ChannelError};

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("failed to spawn {role} {id}: {source}")]
    Spawn {
        role: &'static str,
        id: usize,
        source: std::io::Error,
    },
    #[error("producer {0} panicked")]
    ProducerPanicked(usize),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("bounded_channel: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), DemoError> {
    concord::init_tracing();

    let config = ChannelConfig::default();
    let channel = Arc::new(BoundedChannel::<u64>::new(config.capacity)?);
    let started = Instant::now();

    // Consumers first: they park on the empty channel until items arrive.
    for id in 0..config.consumers {
        let channel = Arc::clone(&channel);
        let pacing = config.consume;
        thread::Builder::new()
            .name(format!("consumer-{id}"))
            .spawn(move || {
                while channel
                    .consume_inspect(|slot, item, view| {
                        println!("[Consumer {id}] Consumed {item} from slot {slot} | {view}");
                    })
                    .is_ok()
                {
                    pacing.pause();
                }
            })
            .map_err(|source| DemoError::Spawn {
                role: "consumer",
                id,
                source,
            })?;
    }

    let mut producers = Vec::with_capacity(config.producers);
    for id in 0..config.producers {
        let channel = Arc::clone(&channel);
        let pacing = config.produce;
        let items = config.items_per_producer;
        let handle = thread::Builder::new()
            .name(format!("producer-{id}"))
            .spawn(move || {
                for sequence in 0..items {
                    let item = ChannelConfig::item(id, sequence);
                    pacing.pause();
                    let sent = channel.produce_inspect(item, |slot, view| {
                        println!("[Producer {id}] Produced {item} at slot {slot} | {view}");
                    });
                    if sent.is_err() {
                        break;
                    }
                }
                println!("[Producer {id}] Finished producing.");
            })
            .map_err(|source| DemoError::Spawn {
                role: "producer",
                id,
                source,
            })?;
        producers.push((id, handle));
    }

    for (id, handle) in producers {
        handle.join().map_err(|_| DemoError::ProducerPanicked(id))?;
    }

    println!(
        "All producers finished after {:.2?} ({} items). Exiting.",
        started.elapsed(),
        config.total_items()
    );

    Ok(())
}
