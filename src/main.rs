//! `pcprobe`: load the native performance counter library, register the
//! configured counters, and print samples as JSON lines.
//!
//! Exits with status 2 when Windows performance counters are unavailable on
//! this host, so scripts can tell "unsupported" apart from a bad config (1).

use std::{io::Write, path::PathBuf, process::ExitCode, thread, time::Duration};

use clap::Parser;
use log::{error, info};
use perfcounter_bridge::{Connector, ConnectorConfig, CounterSet};

/// Sample Windows performance counters through the native bridge.
#[derive(Parser, Debug)]
#[command(name = "pcprobe")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file (library location and counters)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Directory containing the native library; overrides the config file
    #[arg(long)]
    library_dir: Option<PathBuf>,

    /// Number of samples to take
    #[arg(short = 'n', long, default_value = "1")]
    samples: u32,

    /// Delay between samples in milliseconds
    #[arg(short = 'i', long, default_value = "1000")]
    interval_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let mut config = match &args.config {
        Some(path) => match ConnectorConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Cannot read configuration {}: {e}", path.display());
                return ExitCode::from(1);
            }
        },
        None => ConnectorConfig::default(),
    };
    if args.library_dir.is_some() {
        config.library_dir = args.library_dir.clone();
    }

    let counters = config.effective_counters();
    let connector = Connector::new(config);
    if !connector.initialize() {
        error!("Windows performance counters are not available on this host");
        return ExitCode::from(2);
    }
    info!(
        "Native library loaded, process instance name: {}",
        connector.instance_name().unwrap_or("<unknown>")
    );

    let set = CounterSet::register(&connector, &counters);
    info!("Registered {} of {} performance counters", set.len(), counters.len());

    let stdout = std::io::stdout();
    for i in 0..args.samples {
        if i > 0 {
            thread::sleep(Duration::from_millis(args.interval_ms));
        }
        let mut out = stdout.lock();
        for sample in set.sample(&connector) {
            let written = serde_json::to_writer(&mut out, &sample)
                .map_err(std::io::Error::other)
                .and_then(|()| writeln!(out));
            if let Err(e) = written {
                error!("Cannot write sample: {e}");
                return ExitCode::from(1);
            }
        }
    }

    ExitCode::SUCCESS
}
