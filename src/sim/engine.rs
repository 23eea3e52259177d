//! Simulation engine that drives one cycle across every farm of the fleet.

use chrono::{DateTime, Timelike, Utc};
use tracing::{debug, info, warn};

use crate::sink::{self, MetricSink, SinkError};

use super::anomaly;
use super::physics::{
    STC_IRRADIANCE_WM2, ambient_temperature, irradiance_at_hour, panel_temperature,
};
use super::rng::RandomSource;
use super::state::FarmState;
use super::types::{CycleMetrics, CycleReport, Farm, FarmReading, SimConfig};

/// Simulation engine owning the fleet, its running state, and the random source.
///
/// Generic over `R: RandomSource` so tests can script every draw. Farms are
/// processed sequentially in fleet order; the sink is written only after
/// every farm of the tick has been computed.
pub struct Engine<R: RandomSource> {
    config: SimConfig,
    farms: Vec<Farm>,
    states: Vec<FarmState>,
    rng: R,
    cycles: u64,
}

impl<R: RandomSource> Engine<R> {
    /// Creates a new engine.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine settings
    /// * `farms` - Fleet definition, in publication order
    /// * `rng` - Random source for jitter and anomalies
    /// * `started_at` - Reference time for uptime and day tracking
    pub fn new(config: SimConfig, farms: Vec<Farm>, rng: R, started_at: DateTime<Utc>) -> Self {
        let states = farms.iter().map(|_| FarmState::new(started_at)).collect();
        Self {
            config,
            farms,
            states,
            rng,
            cycles: 0,
        }
    }

    /// Computes one cycle for every farm at `now` without publishing.
    ///
    /// Mutates farm state (anomalies, uptime, revenue, day marker).
    pub fn step(&mut self, now: DateTime<Utc>) -> CycleReport {
        let index = self.cycles;
        self.cycles += 1;

        let mut readings = Vec::with_capacity(self.farms.len());
        for (farm, state) in self.farms.iter().zip(self.states.iter_mut()) {
            readings.push(simulate_farm(&self.config, farm, state, &mut self.rng, now));
        }

        CycleReport {
            index,
            at: now,
            readings,
        }
    }

    /// Publishes a report, one farm at a time.
    ///
    /// A sink failure for one farm is logged and does not stop the others.
    /// Returns the number of farms published without error.
    pub fn publish(&self, report: &CycleReport, sink: &impl MetricSink) -> usize {
        let mut published = 0;
        for reading in &report.readings {
            match publish_reading(reading, &self.config, sink) {
                Ok(()) => published += 1,
                Err(err) => {
                    warn!(farm = %reading.farm_id, error = %err, "failed to publish farm metrics");
                }
            }
        }
        published
    }

    /// Runs one full tick: compute every farm, then publish.
    pub fn run_cycle(&mut self, now: DateTime<Utc>, sink: &impl MetricSink) -> CycleReport {
        let report = self.step(now);
        let published = self.publish(&report, sink);
        debug!(
            cycle = report.index,
            farms = report.readings.len(),
            published,
            fleet_watts = report.total_production_watts(),
            "cycle complete"
        );
        report
    }

    /// Marks every inverter as healthy, before the first cycle.
    pub fn publish_initial(&self, sink: &impl MetricSink) {
        for farm in &self.farms {
            for inverter in &self.config.inverter_ids {
                let labels = [("farm", farm.id.as_str()), ("inverter_id", inverter.as_str())];
                if let Err(err) = sink.set_gauge(sink::INVERTER_STATUS, &labels, 1.0) {
                    warn!(farm = %farm.id, error = %err, "failed to initialise inverter status");
                }
            }
        }
    }

    /// Running state of `farm_id`.
    pub fn state(&self, farm_id: &str) -> Option<&FarmState> {
        self.farms
            .iter()
            .position(|f| f.id == farm_id)
            .map(|i| &self.states[i])
    }

    /// Fleet definition.
    pub fn farms(&self) -> &[Farm] {
        &self.farms
    }

    /// Engine settings.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of cycles computed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Random source, for inspecting scripted draws.
    pub fn rng(&self) -> &R {
        &self.rng
    }
}

/// One farm, one cycle: model, anomalies, accounting.
fn simulate_farm<R: RandomSource + ?Sized>(
    config: &SimConfig,
    farm: &Farm,
    state: &mut FarmState,
    rng: &mut R,
    now: DateTime<Utc>,
) -> FarmReading {
    // 1. Physical model
    let hour = now.hour();
    let h = f64::from(hour);
    let irradiance_max = if config.irradiance_jitter {
        STC_IRRADIANCE_WM2 * (0.9 + 0.2 * (rng.next_f64() - 0.5))
    } else {
        STC_IRRADIANCE_WM2
    };
    let irradiance = irradiance_at_hour(h, irradiance_max);
    let ambient_c = ambient_temperature(h, farm.ambient_offset_c);
    let t_panel = panel_temperature(ambient_c, irradiance);
    let theoretical_watts =
        config
            .rating
            .theoretical_production_watts(farm.panel_count, irradiance, t_panel);

    // 2. Injection
    let injected = anomaly::maybe_inject(rng, &config.anomalies, now);
    if let Some(a) = &injected {
        info!(
            farm = %farm.id,
            kind = %a.kind,
            cycles = a.remaining_cycles,
            "anomaly injected"
        );
        state.active_anomalies.push(a.clone());
    }

    // 3. Effects, then aging
    let mut metrics = CycleMetrics::new(irradiance, t_panel, theoretical_watts);
    anomaly::apply_and_age(&mut state.active_anomalies, &mut metrics, rng);
    metrics.production_total_watts = metrics.production_total_watts.max(0.0);
    let production_watts = metrics.production_total_watts;

    // 4. Sensor loss only affects what gets published this cycle
    let per_panel_watts = if farm.panel_count > 0 {
        production_watts / f64::from(farm.panel_count)
    } else {
        0.0
    };
    let (published_panel_temp_c, published_panel_watts) = if metrics.sensor_loss {
        (0.0, 0.0)
    } else {
        (round_to(metrics.panel_temperature, 1), round_to(per_panel_watts, 1))
    };

    // 5. Inverters
    let inverter_statuses = config
        .inverter_ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let status = if metrics.inverter_down && i == 0 { 0 } else { 1 };
            (id.clone(), status)
        })
        .collect();

    // 6. Energy and revenue
    let energy_kwh = production_watts * config.interval_hours() / 1000.0;
    let revenue_eur = energy_kwh * config.tariff_eur_per_kwh;
    state.accumulate_revenue(revenue_eur);

    // 7. Uptime
    if !metrics.inverter_down {
        state.credit_uptime(config.interval_secs as f64, now);
    }

    // 8. Ratios
    let availability = state.availability(now);
    let installed = config.rating.installed_watts(farm.panel_count);
    let efficiency_pct = if installed > 0.0 {
        production_watts / installed * 100.0
    } else {
        0.0
    };

    // 9. Day boundary
    let day_rolled_over = state.roll_over_day(now);
    if day_rolled_over {
        info!(farm = %farm.id, day = state.last_reset_day(), "daily revenue reset");
    }

    FarmReading {
        farm_id: farm.id.clone(),
        hour,
        irradiance,
        ambient_c,
        panel_temp_c: metrics.panel_temperature,
        theoretical_watts,
        production_watts,
        inverter_down: metrics.inverter_down,
        sensor_loss: metrics.sensor_loss,
        injected: injected.map(|a| a.kind),
        active_anomalies: state.active_anomalies.len(),
        published_panel_temp_c,
        published_panel_watts,
        inverter_statuses,
        energy_kwh,
        revenue_eur,
        daily_revenue_eur: state.daily_revenue_eur(),
        uptime_secs: state.uptime_secs(),
        availability,
        efficiency_pct,
        day_rolled_over,
    }
}

/// Writes every series of one farm reading.
///
/// Every write is attempted even after a failure, so counter deltas are
/// never dropped; the first error is returned.
fn publish_reading(
    reading: &FarmReading,
    config: &SimConfig,
    sink: &impl MetricSink,
) -> Result<(), SinkError> {
    let farm = reading.farm_id.as_str();
    let farm_only = [("farm", farm)];
    let mut first_err = None;
    let mut record = |result: Result<(), SinkError>| {
        if let Err(err) = result {
            first_err.get_or_insert(err);
        }
    };

    if reading.revenue_eur > 0.0 {
        record(sink.inc_counter(sink::DAILY_REVENUE_EUROS_TOTAL, &farm_only, reading.revenue_eur));
    }

    if let Some(kind) = reading.injected {
        record(sink.inc_counter(
            sink::ANOMALIES_TOTAL,
            &[("farm", farm), ("type", kind.as_str())],
            1.0,
        ));
    }

    record(sink.set_gauge(sink::IRRADIANCE_WM2, &farm_only, reading.irradiance));

    for panel in &config.panel_ids {
        let labels = [("farm", farm), ("panel_id", panel.as_str())];
        record(sink.set_gauge(
            sink::PANEL_TEMPERATURE_CELSIUS,
            &labels,
            reading.published_panel_temp_c,
        ));
        record(sink.set_gauge(sink::POWER_WATTS, &labels, reading.published_panel_watts));
    }

    for (inverter, status) in &reading.inverter_statuses {
        let labels = [("farm", farm), ("inverter_id", inverter.as_str())];
        record(sink.set_gauge(sink::INVERTER_STATUS, &labels, f64::from(*status)));
    }

    record(sink.set_gauge(
        sink::AVAILABILITY_RATIO,
        &farm_only,
        round_to(reading.availability, 3),
    ));
    record(sink.set_gauge(
        sink::EFFICIENCY_PERCENT,
        &farm_only,
        round_to(reading.efficiency_pct, 2),
    ));
    record(sink.set_gauge(
        sink::FARM_TOTAL_POWER_WATTS,
        &farm_only,
        reading.production_watts.round(),
    ));

    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
