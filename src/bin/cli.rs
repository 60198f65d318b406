use clap::{App, Arg, SubCommand};
use regulator::{Disposition, Regulator, RegulatorConfig, RegulatorError, Result};
use std::{
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("regulator-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Regulator demo and inspection tool")
        .subcommand(
            SubCommand::with_name("demo")
                .about("Push a burst of messages through a regulator and show pacing")
                .arg(
                    Arg::with_name("messages")
                        .short("m")
                        .long("messages")
                        .value_name("COUNT")
                        .help("Number of messages in the burst")
                        .default_value("5")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("period")
                        .short("p")
                        .long("period-ms")
                        .value_name("MS")
                        .help("Delivery period in milliseconds")
                        .default_value("500")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("per_period")
                        .short("n")
                        .long("per-period")
                        .value_name("COUNT")
                        .help("Maximum deliveries per period")
                        .default_value("2")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("size")
                        .short("s")
                        .long("message-size")
                        .value_name("BYTES")
                        .help("Buffer size in bytes")
                        .default_value("64")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("info")
                .about("Show version and capability information"),
        )
        .get_matches();

    match matches.subcommand() {
        ("demo", Some(demo_matches)) => run_demo(demo_matches),
        ("info", Some(_)) => show_info(),
        _ => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

fn parse_arg(matches: &clap::ArgMatches, name: &'static str) -> Result<usize> {
    matches
        .value_of(name)
        .unwrap()
        .parse()
        .map_err(|_| RegulatorError::invalid_number(name))
}

fn run_demo(matches: &clap::ArgMatches) -> Result<()> {
    let messages = parse_arg(matches, "messages")?;
    let period_ms = parse_arg(matches, "period")?;
    let per_period = parse_arg(matches, "per_period")?;
    let size = parse_arg(matches, "size")?;

    println!("Burst of {} messages, {} per {}ms period", messages, per_period, period_ms);

    let started = Instant::now();
    let log: Arc<Mutex<Vec<(Duration, String)>>> = Arc::new(Mutex::new(Vec::new()));

    let deliverer = {
        let log = Arc::clone(&log);
        move |_: &regulator::Releaser<'_>,
              message: regulator::MessageBuffer,
              length: usize| {
            let text = String::from_utf8_lossy(&message.as_slice()[..length]).into_owned();
            log.lock().unwrap().push((started.elapsed(), text));
            Disposition::ReleaseNow(message)
        }
    };

    let config = RegulatorConfig::new()
        .with_max_message_size(size)
        .with_max_messages(messages.max(1))
        .with_delivery_priority(16)
        .with_delivery_period(Duration::from_millis(period_ms as u64))
        .with_max_dequeue_per_period(per_period);

    let regulator = Regulator::create(config, deliverer)?;

    for i in 1..=messages {
        let mut buffer = regulator.obtain_buffer()?;
        let text = format!("message {}", i);
        buffer.write(text.as_bytes())?;
        let length = text.len();
        if let Err(rejected) = regulator.send(buffer, length) {
            println!("send of message {} rejected: {}", i, rejected.error);
            regulator.release_buffer(rejected.buffer)?;
        }
    }

    // Enough periods for the whole burst plus one spare boundary.
    let periods = (messages + per_period - 1) / per_period + 1;
    thread::sleep(Duration::from_millis((period_ms * periods) as u64));

    println!("\nDeliveries:");
    for (at, text) in log.lock().unwrap().iter() {
        println!("  {:>6}ms  {}", at.as_millis(), text);
    }

    let stats = regulator.statistics()?;
    println!("\nStatistics:");
    println!("  obtained:  {}", stats.obtained);
    println!("  released:  {}", stats.released);
    println!("  delivered: {}", stats.delivered);
    println!("  periods:   {} ({} missed)", stats.period_count, stats.period_missed_count);

    regulator.delete(Duration::from_secs(5))?;
    Ok(())
}

fn show_info() -> Result<()> {
    println!("Regulator - paced message delivery");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));

    println!("\nCapabilities:");
    println!("  - Fixed-capacity buffer pool with exhaustion backpressure");
    println!("  - Bounded FIFO submission queue");
    println!("  - Periodic delivery thread with deadline-miss accounting");
    println!("  - Typed buffer ownership transfer (no double release)");

    Ok(())
}
