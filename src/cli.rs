use std::env;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Parsed command-line options.
#[derive(Debug, Default)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub preset: Option<String>,
    pub seed: Option<u64>,
    /// Offline replay length; service mode when absent.
    pub cycles: Option<u64>,
    /// Start of an offline replay; now when absent.
    pub start: Option<DateTime<Utc>>,
    pub port: Option<u16>,
    pub log_json: bool,
    pub help: bool,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

pub fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    let mut opts = CliOptions::default();
    let mut i = 0usize;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --config (expected a TOML file path)")?;
                if opts.config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let seed = raw
                    .parse()
                    .map_err(|_| format!("--seed value \"{raw}\" is not a valid u64"))?;
                opts.seed = Some(seed);
            }
            "--cycles" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --cycles (expected a count)")?;
                let cycles = raw
                    .parse()
                    .map_err(|_| format!("--cycles value \"{raw}\" is not a valid count"))?;
                opts.cycles = Some(cycles);
            }
            "--start" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --start (expected RFC 3339)")?;
                let start = DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| format!("--start value \"{raw}\" is not RFC 3339: {e}"))?;
                opts.start = Some(start.with_timezone(&Utc));
            }
            "--port" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --port (expected a u16)")?;
                let port = raw
                    .parse()
                    .map_err(|_| format!("--port value \"{raw}\" is not a valid port"))?;
                opts.port = Some(port);
            }
            "--log-json" => opts.log_json = true,
            "--help" | "-h" => opts.help = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.config.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--config` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }
    if opts.start.is_some() && opts.cycles.is_none() {
        return Err("--start only applies to an offline replay (--cycles)".to_string());
    }

    Ok(opts)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("solar-farm-sim: solar farm telemetry simulator");
    eprintln!();
    eprintln!("Usage: solar-farm-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>     Load configuration from a TOML file");
    eprintln!("  --preset <name>     Use a built-in preset (baseline, calm, stormy)");
    eprintln!("  --seed <u64>        Override random seed");
    eprintln!("  --cycles <n>        Replay n cycles offline and print a summary");
    eprintln!("  --start <rfc3339>   Start time of the offline replay (default: now)");
    eprintln!("  --port <u16>        Metrics port (overrides PORT and config)");
    eprintln!("  --log-json          Emit logs as JSON");
    eprintln!("  --help              Show this help message");
    eprintln!();
    eprintln!("If no --config or --preset is given, the baseline preset is used.");
}
