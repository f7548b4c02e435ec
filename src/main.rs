//! Drishti - Traffic-light stop-waypoint detector
//!
//! Replays recorded inputs through the detector and prints one stop waypoint
//! per processed frame (`-1` when no stop is required).
//!
//! ```text
//! drishti --replay run.jsonl [--config drishti.toml] [--realtime]
//! ```
//!
//! Without `--realtime` every frame is processed in order on the main thread.
//! With it, records are paced by their `t_us` and fed to the detector thread,
//! which still runs one pass per frame.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use drishti::classifier::create_classifier;
use drishti::config::DrishtiConfig;
use drishti::error::{Error, Result};
use drishti::node::{self, DetectorNode, NodeStatus};
use drishti::replay::Replay;
use drishti::{PassOutcome, StopWaypoint};

/// Command-line options.
struct Args {
    config: Option<PathBuf>,
    replay: PathBuf,
    realtime: bool,
}

const USAGE: &str = "usage: drishti --replay <file.jsonl> [--config <drishti.toml>] [--realtime]";

/// Parse arguments.
///
/// Supports:
/// - `--config <path>` / `-c <path>`
/// - `--replay <path>` / `-r <path>` (or the first positional argument)
/// - `--realtime`
/// - `--help` / `-h` (prints usage, returns `None`)
fn parse_args<I>(args: I) -> Result<Option<Args>>
where
    I: IntoIterator<Item = String>,
{
    let mut config = None;
    let mut replay = None;
    let mut realtime = false;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => config = args.next().map(PathBuf::from),
            "--replay" | "-r" => replay = args.next().map(PathBuf::from),
            "--realtime" => realtime = true,
            "--help" | "-h" => {
                println!("{}", USAGE);
                return Ok(None);
            }
            other if !other.starts_with('-') && replay.is_none() => {
                replay = Some(PathBuf::from(other));
            }
            other => return Err(Error::Other(format!("unknown argument {}\n{}", other, USAGE))),
        }
    }

    let replay = replay.ok_or_else(|| Error::Other(USAGE.into()))?;
    Ok(Some(Args {
        config,
        replay,
        realtime,
    }))
}

fn main() -> Result<()> {
    let Some(args) = parse_args(env::args().skip(1))? else {
        return Ok(());
    };

    let config = match &args.config {
        Some(path) => DrishtiConfig::load(path)?,
        None => {
            let config = DrishtiConfig::default();
            config.validate()?;
            config
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("Drishti v{} starting...", env!("CARGO_PKG_VERSION"));
    match &args.config {
        Some(path) => log::info!("Using config: {}", path.display()),
        None => log::info!("Using built-in defaults"),
    }
    log::info!(
        "{} stop lines, radius {:.1} m, debounce threshold {}",
        config.stop_line.positions.len(),
        config.association.stop_line_radius,
        config.debounce.threshold
    );

    let replay = Replay::load(&args.replay)?;
    log::info!(
        "Replay {}: {} records, {} frames",
        args.replay.display(),
        replay.len(),
        replay.frame_count()
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let status = if args.realtime {
        run_realtime(&config, &replay, &running)?
    } else {
        run_lock_step(&config, &replay, &running)?
    };

    log::info!(
        "Done: {} frames, {} passes ({} without result, peak backlog {}), last output {}",
        status.frames_received,
        status.passes,
        status.passes_without_result,
        status.peak_backlog,
        status
            .last_output
            .map(|w| w.to_string())
            .unwrap_or_else(|| "none".into())
    );
    Ok(())
}

fn publish(waypoint: StopWaypoint) {
    println!("{}", waypoint.to_wire());
}

/// Process every record in order on this thread.
fn run_lock_step(
    config: &DrishtiConfig,
    replay: &Replay,
    running: &AtomicBool,
) -> Result<NodeStatus> {
    let mut detector = DetectorNode::new(config, create_classifier(&config.classifier));

    for record in replay.records() {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        let input = replay.to_input(record)?;
        if let Some(PassOutcome::Emit(report)) = detector.handle(input) {
            publish(report.waypoint);
        }
    }

    let status = detector.status().lock().clone();
    Ok(status)
}

/// Feed records to the detector thread at their recorded pace.
fn run_realtime(
    config: &DrishtiConfig,
    replay: &Replay,
    running: &AtomicBool,
) -> Result<NodeStatus> {
    let handle = node::spawn(config, create_classifier(&config.classifier))?;

    let start = Instant::now();
    let first_t = replay.records().iter().find_map(|r| r.t_us).unwrap_or(0);
    for record in replay.records() {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        if let Some(t_us) = record.t_us {
            let due = Duration::from_micros(t_us.saturating_sub(first_t));
            if let Some(wait) = due.checked_sub(start.elapsed()) {
                thread::sleep(wait);
            }
        }
        handle.send(replay.to_input(record)?)?;
        handle.outputs().try_iter().for_each(publish);
    }

    let (status, pending) = handle.shutdown()?;
    pending.into_iter().for_each(publish);
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<Args>> {
        parse_args(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn test_help_is_not_an_error() {
        assert!(matches!(parse(&["--help"]), Ok(None)));
        assert!(matches!(parse(&["-r", "run.jsonl", "-h"]), Ok(None)));
    }

    #[test]
    fn test_parse_flags() {
        let args = parse(&["-c", "drishti.toml", "--realtime", "run.jsonl"])
            .unwrap()
            .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("drishti.toml")));
        assert_eq!(args.replay, PathBuf::from("run.jsonl"));
        assert!(args.realtime);
    }

    #[test]
    fn test_missing_replay_and_unknown_flag() {
        assert!(matches!(parse(&[]), Err(Error::Other(_))));
        assert!(matches!(parse(&["--bogus", "run.jsonl"]), Err(Error::Other(_))));
    }
}
