//! Test application parking a group of threads on a locked gate. A few tickets are handed out
//! one at a time, after which the gate opens and releases everybody left. SIGINT/SIGTERM opens
//! the gate right away. A JSON summary of the run is dumped on stdout.
#[macro_use]
extern crate clap;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate slog;

use gatekeeper::primitives::event::*;
use gatekeeper::primitives::gate::*;
use rand::{thread_rng, Rng};
use slog::{Drain, Level, LevelFilter, Logger};
use slog_async::Async;
use slog_term::{FullFormat, PlainSyncDecorator};
use std::cmp;
use std::convert::TryFrom;
use std::io::stderr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
struct Report {
    size: usize,
    tickets: usize,
    one_by_one: usize,
    on_unlock: usize,
    interrupted: bool,
    elapsed_ms: u64,
}

//
// - hand out the tickets one by one
// - block until the corresponding thread went through
// - stop as soon as we get interrupted
//
fn hand_out<F>(gate: &Gate, passed: &AtomicUsize, tickets: usize, settled: &F, log: &Logger) -> usize
where
    F: Fn() -> bool,
{
    let mut redeemed = 0;
    for n in 0..tickets {
        if settled() {
            break;
        }
        gate.unlock_one();
        while !settled() && passed.load(Ordering::Acquire) <= n {
            thread::sleep(Duration::from_millis(1));
        }
        if passed.load(Ordering::Acquire) <= n {
            break;
        }
        redeemed += 1;
        info!(log, "ticket #{} redeemed", n; "pending" => gate.pending());
    }
    redeemed
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn main() {

    //
    // - parse the CLI line
    //
    let args = clap_app!(turnstile =>
        (version: env!("CARGO_PKG_VERSION"))
        (@arg SIZE: -s --size +takes_value "number of threads to park")
        (@arg TICKETS: -t --tickets +takes_value "number of tickets handed out before opening")
        (@arg VERBOSE: -v --verbose "trace the gate transitions")
    ).get_matches();

    //
    // - init slog to dump on stderr
    //
    let level = if args.is_present("VERBOSE") { Level::Trace } else { Level::Info };
    let decorator = PlainSyncDecorator::new(stderr());
    let formatted = FullFormat::new(decorator).build().fuse();
    let drain = Async::new(formatted).build().fuse();
    let filter = LevelFilter::new(drain, level).fuse();
    let root = Logger::root(filter, o!());
    let log = root.new(o!("sys" => "main"));
    debug!(&log, "starting (version={})", env!("CARGO_PKG_VERSION"));

    //
    // - cap to 1024 threads
    // - we can't hand out more tickets than we have threads
    //
    let size = cmp::min(value_t!(args, "SIZE", usize).unwrap_or(16), 1024);
    let tickets = cmp::min(value_t!(args, "TICKETS", usize).unwrap_or(4), size);
    let gate = Arc::new(Gate::with_logger(true, root.new(o!("sys" => "gate"))));
    let passed = Arc::new(AtomicUsize::new(0));
    let interrupted = Arc::new(AtomicBool::new(false));

    //
    // - trap SIGINT/SIGTERM and open the gate
    // - every parked thread will then go through and drop its guard
    //
    {
        let gate = gate.clone();
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::Release);
            gate.unlock();
        }).unwrap();
    }

    //
    // - use a termination event to synchronize our shutdown sequence
    // - each thread sleeps a bit before reaching the gate
    //
    let event = Event::new();
    let guard = event.guard();
    for id in 0..size {
        let gate = gate.clone();
        let guard = guard.clone();
        let passed = passed.clone();
        let log = root.new(o!("sys" => "worker", "id" => id));
        let _ = thread::spawn(move || {
            thread::sleep(Duration::from_millis(thread_rng().gen_range(0..10)));
            gate.wait();
            passed.fetch_add(1, Ordering::AcqRel);
            debug!(&log, "through");
            drop(guard);
        });
    }

    let settled = || interrupted.load(Ordering::Acquire);
    while !settled() && gate.pending() + passed.load(Ordering::Acquire) < size {
        thread::sleep(Duration::from_millis(1));
    }
    info!(&log, "{} threads parked", gate.pending());

    let start = Instant::now();
    let redeemed = hand_out(&gate, &passed, tickets, &settled, &log);
    debug!(&log, "{} tickets redeemed", redeemed);

    //
    // - open the gate and block on the termination event
    // - we are waiting for all our threads to go through
    //
    let one_by_one = passed.load(Ordering::Acquire);
    gate.unlock();
    drop(guard);
    event.wait();

    let report = Report {
        size,
        tickets,
        one_by_one,
        on_unlock: size - one_by_one,
        interrupted: settled(),
        elapsed_ms: elapsed_ms(start),
    };
    println!("{}", serde_json::to_string_pretty(&report).unwrap());
    info!(&log, "exiting");
}
