//! Dining philosophers over a [`ResourceRing`].
//!
//! Usage:
//!     cargo run --bin resource_ring
//!
//! Five philosophers, three meals each, one second to think and one to eat.
//! Every step is printed to stdout. Build with `--features tracing` for
//! structured logs on stderr as well (`RUST_LOG=concord=trace`).

use concord::ring::{ResourceRing, RingConfig, RingError, RingEvent};

fn main() {
    if let Err(e) = run() {
        eprintln!("resource_ring: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), RingError> {
    concord::init_tracing();

    let config = RingConfig::default();
    let rounds = config.rounds;
    let ring = ResourceRing::new(config)?;

    println!("{} philosophers, {} rounds each", ring.len(), rounds);

    let report = ring.run(|event| match event {
        RingEvent::Thinking { actor, .. } => {
            println!("Philosopher {actor} is thinking...");
        }
        RingEvent::AwaitingFirst {
            actor, resource, ..
        }
        | RingEvent::AwaitingSecond {
            actor, resource, ..
        } => {
            println!("Philosopher {actor} is waiting for fork {resource}");
        }
        RingEvent::Working { actor, .. } => {
            println!("Philosopher {actor} is EATING");
        }
        RingEvent::Finished { actor, round } => {
            println!("Philosopher {actor} finished eating round {round}.");
        }
    })?;

    for actor in &report.actors {
        println!(
            "Philosopher {} ate {} times, waited {:.2?} for forks",
            actor.actor, actor.rounds, actor.waited
        );
    }
    println!(
        "All philosophers done: {} meals in {:.2?}",
        report.total_rounds(),
        report.elapsed
    );

    Ok(())
}
