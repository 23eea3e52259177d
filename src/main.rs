//! Solar farm simulator entry point: CLI wiring and config-driven engine construction.

use std::process;

use chrono::Utc;
use tracing::{error, info};

use solar_farm_sim::cli::{self, CliOptions};
use solar_farm_sim::config::SimulatorConfig;
use solar_farm_sim::runner::run_with_ticker;
use solar_farm_sim::sim::clock::SimulatedClock;
use solar_farm_sim::sim::engine::Engine;
use solar_farm_sim::sim::kpi::RunSummary;
use solar_farm_sim::sim::rng::seeded_rng;
use solar_farm_sim::sink::MemorySink;
use solar_farm_sim::telemetry::init_tracing;

fn load_config(cli: &CliOptions) -> anyhow::Result<SimulatorConfig> {
    let mut config = match (&cli.config, &cli.preset) {
        (Some(path), _) => SimulatorConfig::from_toml_file(path)?,
        (None, Some(name)) => SimulatorConfig::from_preset(name)?,
        (None, None) => SimulatorConfig::baseline(),
    };
    if let Some(seed) = cli.seed {
        config.simulation.seed = Some(seed);
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = match cli::parse_args() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("error: {err}");
            cli::print_usage();
            process::exit(2);
        }
    };
    if cli.help {
        cli::print_usage();
        return Ok(());
    }

    init_tracing(cli.log_json);

    let config = load_config(&cli)?;
    let errors = config.validate();
    if !errors.is_empty() {
        for err in &errors {
            error!(field = %err.field, "{}", err.message);
        }
        anyhow::bail!("invalid configuration ({} error(s))", errors.len());
    }

    let sim = config.to_sim_config();
    let farms = config.farms();
    let rng = seeded_rng(config.simulation.seed);

    if let Some(cycles) = cli.cycles {
        let start = cli.start.unwrap_or_else(Utc::now);
        info!(cycles, %start, farms = farms.len(), "offline replay");
        let interval_secs = sim.interval_secs;
        let mut engine = Engine::new(sim, farms, rng, start);
        let mut clock = SimulatedClock::new(start, interval_secs, cycles);
        let sink = MemorySink::new();
        let reports = run_with_ticker(&mut engine, &mut clock, &sink, |report| {
            print!("{report}");
        });
        println!("{}", RunSummary::from_reports(&reports));
        return Ok(());
    }

    serve(&cli, &config, Engine::new(sim, farms, rng, Utc::now()))
}

#[cfg(feature = "api")]
fn serve(
    cli: &CliOptions,
    config: &SimulatorConfig,
    engine: Engine<rand::rngs::StdRng>,
) -> anyhow::Result<()> {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use anyhow::Context;
    use solar_farm_sim::sink::PrometheusSink;

    let env_port = std::env::var("PORT").ok();
    let port = config.resolve_port(cli.port, env_port.as_deref())?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let sink = PrometheusSink::new(Arc::new(prometheus::Registry::new()))?;

    info!(
        interval_secs = engine.config().interval_secs,
        farms = engine.farms().len(),
        port,
        "starting solar farm simulator"
    );

    let rt = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    rt.block_on(solar_farm_sim::api::serve(engine, sink, addr))
}

#[cfg(not(feature = "api"))]
fn serve(
    _cli: &CliOptions,
    _config: &SimulatorConfig,
    mut engine: Engine<rand::rngs::StdRng>,
) -> anyhow::Result<()> {
    use solar_farm_sim::sim::clock::WallClock;

    info!(
        interval_secs = engine.config().interval_secs,
        farms = engine.farms().len(),
        "starting solar farm simulator without HTTP exposition"
    );
    let mut clock = WallClock::new(engine.config().interval_secs);
    let sink = MemorySink::new();
    run_with_ticker(&mut engine, &mut clock, &sink, |report| {
        for reading in &report.readings {
            info!("{reading}");
        }
    });
    Ok(())
}
