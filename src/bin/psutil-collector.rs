//! psutil-collector - command-line front end of the psutil plugin.
//!
//! Lists the metric catalog, prints the configuration policy, and collects
//! namespaces once or on an interval until interrupted.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use psutil_collector::collector::{ProcfsStats, RealFs, SystemStats};
use psutil_collector::{
    CollectionRequest, CollectorConfig, Metric, Namespace, PluginError, PsutilCollector,
    list_metric_descriptors,
};

/// Host metrics collector with a namespace catalog.
#[derive(Parser)]
#[command(name = "psutil-collector", about = "Host metrics collector", version)]
struct Args {
    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc", global = true)]
    proc_path: String,

    /// Path to /sys filesystem.
    #[arg(long, default_value = "/sys", global = true)]
    sys_path: String,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every metric family this host can report.
    MetricTypes {
        /// Print as a JSON array.
        #[arg(long)]
        json: bool,
    },
    /// Collect the given namespaces, e.g. /intel/psutil/cpu/*/user.
    Collect {
        /// Disk filter: '*', 'all', 'physical' or a '|'-separated list of mount points.
        #[arg(long)]
        mount_points: Option<String>,

        /// Repeat collection every N seconds until interrupted.
        #[arg(short, long)]
        interval: Option<u64>,

        /// Print metrics as JSON lines.
        #[arg(long)]
        json: bool,

        #[arg(required = true)]
        namespaces: Vec<String>,
    },
    /// Print the configuration policy as JSON.
    Policy,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("psutil_collector={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    debug!(
        "psutil-collector {}: proc={}, sys={}",
        env!("CARGO_PKG_VERSION"),
        args.proc_path,
        args.sys_path
    );

    if list_metric_descriptors().is_empty() {
        warn!("No procfs on this platform, the catalog is empty");
    }
    let stats = ProcfsStats::new(RealFs::new(), &args.proc_path).with_sys_path(&args.sys_path);

    match run(PsutilCollector::new(stats), args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run<S: SystemStats>(collector: PsutilCollector<S>, command: Command) -> Result<(), PluginError> {
    match command {
        Command::MetricTypes { json } => {
            let types = collector.get_metric_types(&CollectorConfig::default())?;
            if json {
                println!("{}", to_json(&types));
            } else {
                for descriptor in &types {
                    println!(
                        "{}\t{}\t{}",
                        descriptor.namespace, descriptor.unit, descriptor.description
                    );
                }
            }
        }
        Command::Policy => {
            println!("{}", to_json(&collector.get_config_policy()));
        }
        Command::Collect {
            mount_points,
            interval,
            json,
            namespaces,
        } => {
            let config = CollectorConfig { mount_points };
            let requests = namespaces
                .iter()
                .map(|ns| {
                    ns.parse::<Namespace>()
                        .map(|namespace| CollectionRequest::new(namespace).with_config(config.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            match interval {
                None => print_metrics(&collector.collect_metrics(&requests)?, json),
                Some(secs) => collect_loop(&collector, &requests, Duration::from_secs(secs), json)?,
            }
        }
    }
    Ok(())
}

/// Collects until Ctrl-C. A failed round is logged and the loop continues.
fn collect_loop<S: SystemStats>(
    collector: &PsutilCollector<S>,
    requests: &[CollectionRequest],
    interval: Duration,
    json: bool,
) -> Result<(), PluginError> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Collecting {} namespaces every {:?}", requests.len(), interval);
    let mut round: u64 = 0;

    while running.load(Ordering::SeqCst) {
        round += 1;
        match collector.collect_metrics(requests) {
            Ok(metrics) => {
                debug!("Round #{}: {} metrics", round, metrics.len());
                print_metrics(&metrics, json);
            }
            Err(e @ PluginError::UnknownDomain { .. })
            | Err(e @ PluginError::UnknownStatistic { .. }) => return Err(e),
            Err(e) => error!("Round #{} failed: {}", round, e),
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutdown complete");
    Ok(())
}

fn print_metrics(metrics: &[Metric], json: bool) {
    for metric in metrics {
        if json {
            println!("{}", to_json(metric));
        } else {
            println!(
                "{} {} {} {}",
                metric.timestamp.to_rfc3339(),
                metric.namespace,
                metric.value,
                metric.unit
            );
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        error!("Failed to serialize output: {}", e);
        String::new()
    })
}
