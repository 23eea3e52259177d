use tracing::info;

use crate::sim::clock::Ticker;
use crate::sim::engine::Engine;
use crate::sim::rng::RandomSource;
use crate::sim::types::CycleReport;
use crate::sink::MetricSink;

/// Drives `engine` from `ticker` until the ticker is exhausted.
///
/// Inverter statuses are initialised before the first tick. Every report is
/// handed to `on_cycle` and collected.
///
/// # Arguments
///
/// * `engine` - Engine to drive
/// * `ticker` - Tick source (simulated or wall clock)
/// * `sink` - Destination of published measurements
/// * `on_cycle` - Callback invoked after each published cycle
pub fn run_with_ticker<R, T, S>(
    engine: &mut Engine<R>,
    ticker: &mut T,
    sink: &S,
    mut on_cycle: impl FnMut(&CycleReport),
) -> Vec<CycleReport>
where
    R: RandomSource,
    T: Ticker + ?Sized,
    S: MetricSink,
{
    engine.publish_initial(sink);

    let mut reports = Vec::new();
    while let Some(tick) = ticker.next_tick() {
        let report = engine.run_cycle(tick.at, sink);
        on_cycle(&report);
        reports.push(report);
    }

    info!(cycles = reports.len(), "run finished");
    reports
}
