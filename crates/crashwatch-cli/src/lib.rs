//! crashwatch-cli: demonstration shell around the detection core.
//!
//! Thin presentation glue: it installs the reporter, then exposes the
//! two narrow entry points into the core ("trigger a named failure"
//! and "read the tail of the persisted log") plus a watchdog demo.

pub mod cli;
pub mod config;
pub mod triggers;

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

use crashwatch_core::monitor::{LifecycleEvent, Task, ThreadMonitor};
use crashwatch_core::{reporter, Logger};

use cli::{Cli, Command};

/// Entry point for the crashwatch binary.
pub fn run() -> Result<()> {
    let args = Cli::parse_args();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(args.log_level.clone()),
    )
    .init();

    let config = config::load_config().unwrap_or_else(|err| {
        log::warn!("Failed to load config, using defaults: {}", err);
        config::Config::default()
    });
    if let Some(path) = &config.log_path {
        Logger::init_global(path.clone());
    }

    // Handlers must be in place before anything that might fault.
    reporter::initialize();

    match args.command {
        Command::Crash { name } => {
            log::info!("Triggering '{}' in 2 seconds", name);
            triggers::trigger_named_failure(&name);
        }
        Command::Log => {
            println!("{}", Logger::global().read_tail(config.tail_lines));
        }
        Command::Clear => {
            Logger::global().clear();
            log::info!("Log cleared");
        }
        Command::Diagnostics => {
            println!("{}", Logger::global().diagnostics());
        }
        Command::Hang { threshold, block } => {
            run_hang_demo(
                hang_threshold(threshold, &config),
                Duration::from_secs_f64(block),
            );
        }
    }

    Ok(())
}

/// The watchdog threshold for a `hang` run: the `--threshold` flag when
/// given, the configured value otherwise.
fn hang_threshold(flag: Option<f64>, config: &config::Config) -> Duration {
    Duration::from_secs_f64(flag.unwrap_or(config.hang_threshold_secs))
}

/// Runs the watchdog against a channel-serviced primary loop, blocking
/// the loop once so at least one hang report fires. Reports go both to
/// stderr and to the persistent log.
fn run_hang_demo(threshold: Duration, block: Duration) {
    let (tx, rx) = mpsc::channel::<Task>();
    let monitor = ThreadMonitor::with_threshold(Arc::new(tx.clone()), threshold).on_hang(
        |duration| {
            let message = format!(
                "Main thread blocked for {:.2} seconds",
                duration.as_secs_f64()
            );
            eprintln!("{}", message);
            Logger::global().warning(&message);
        },
    );
    monitor.handle_lifecycle_event(LifecycleEvent::BecameActive);
    monitor.start_monitoring();

    log::info!(
        "Blocking the primary loop for {:.1}s with a {:.1}s threshold",
        block.as_secs_f64(),
        threshold.as_secs_f64()
    );
    tx.send(Box::new(move || thread::sleep(block))).ok();

    // Service the primary loop long enough to show the hang and a few
    // healthy cycles afterwards, then shut down.
    let deadline = Instant::now() + block + threshold.saturating_mul(4);
    while Instant::now() < deadline {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(task) => task(),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    monitor.stop_monitoring();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_threshold_reaches_the_monitor() {
        let config = config::Config {
            hang_threshold_secs: 1.5,
            ..config::Config::default()
        };
        let (tx, _rx) = mpsc::channel::<Task>();
        let monitor = ThreadMonitor::with_threshold(Arc::new(tx), hang_threshold(None, &config));
        assert_eq!(monitor.threshold(), Duration::from_secs_f64(1.5));
    }

    #[test]
    fn threshold_flag_overrides_config() {
        let config = config::Config {
            hang_threshold_secs: 1.5,
            ..config::Config::default()
        };
        assert_eq!(
            hang_threshold(Some(0.25), &config),
            Duration::from_secs_f64(0.25)
        );
    }
}
