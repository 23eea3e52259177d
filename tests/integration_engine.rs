//! End-to-end engine behaviour over the baseline fleet.

mod common;

use chrono::Duration;

use solar_farm_sim::runner::run_with_ticker;
use solar_farm_sim::sim::anomaly::AnomalyKind;
use solar_farm_sim::sim::clock::SimulatedClock;
use solar_farm_sim::sim::engine::Engine;
use solar_farm_sim::sim::kpi::RunSummary;
use solar_farm_sim::sim::rng::{SequenceRng, seeded_rng};
use solar_farm_sim::sim::types::SimConfig;
use solar_farm_sim::sink::{self, MemorySink, MetricSink, SinkError};

use common::{baseline_engine, june_first, quiet_rng, steady_config};

#[test]
fn baseline_fleet_at_noon() {
    let mut engine = baseline_engine(steady_config(), quiet_rng(), june_first(12));
    let report = engine.step(june_first(12));

    let ids: Vec<_> = report.readings.iter().map(|r| r.farm_id.as_str()).collect();
    assert_eq!(ids, ["provence", "occitanie", "aquitaine"]);

    let provence = report.reading("provence").unwrap();
    assert_eq!(provence.ambient_c, 32.0);
    assert!((provence.panel_temp_c - 62.0).abs() < 1e-9);
    assert!((provence.production_watts - 1_479_850.0).abs() < 1.0);

    // offsets only shift temperature, which lowers output
    let occitanie = report.reading("occitanie").unwrap();
    let aquitaine = report.reading("aquitaine").unwrap();
    assert_eq!(occitanie.ambient_c, 31.0);
    assert_eq!(aquitaine.ambient_c, 30.0);
    assert!(aquitaine.efficiency_pct > occitanie.efficiency_pct);
    assert!(occitanie.efficiency_pct > provence.efficiency_pct);
}

#[test]
fn night_produces_nothing() {
    let mut engine = baseline_engine(SimConfig::default(), quiet_rng(), june_first(2));
    let report = engine.step(june_first(2));
    for r in &report.readings {
        assert_eq!(r.irradiance, 0.0);
        assert_eq!(r.production_watts, 0.0);
        assert_eq!(r.revenue_eur, 0.0);
        assert_eq!(r.daily_revenue_eur, 0.0);
    }
}

#[test]
fn no_anomaly_when_draws_stay_above_probability() {
    let start = june_first(0);
    let mut engine = baseline_engine(SimConfig::default(), SequenceRng::constant(0.10), start);
    let mut clock = SimulatedClock::new(start, 300, 288);
    let reports = run_with_ticker(&mut engine, &mut clock, &MemorySink::new(), |_| {});

    assert!(reports.iter().flat_map(|r| &r.readings).all(|r| r.injected.is_none()));
    assert_eq!(RunSummary::from_reports(&reports).anomaly_count(), 0);
}

#[test]
fn inverter_failure_is_published() {
    // provence: inject, kind index 0, duration 1; other farms stay quiet
    let rng = SequenceRng::new([0.0, 0.0, 0.0], 0.5);
    let mut engine = baseline_engine(steady_config(), rng, june_first(12));
    let sink = MemorySink::new();
    engine.publish_initial(&sink);
    let report = engine.run_cycle(june_first(12), &sink);

    assert_eq!(
        report.reading("provence").unwrap().injected,
        Some(AnomalyKind::InverterFailure)
    );
    assert_eq!(
        sink.value(sink::FARM_TOTAL_POWER_WATTS, &[("farm", "provence")]),
        Some(0.0)
    );
    let statuses: Vec<_> = ["INV01", "INV02", "INV03"]
        .iter()
        .map(|inv| {
            sink.value(sink::INVERTER_STATUS, &[("farm", "provence"), ("inverter_id", *inv)])
        })
        .collect();
    assert_eq!(statuses, [Some(0.0), Some(1.0), Some(1.0)]);
    assert_eq!(
        sink.value(
            sink::ANOMALIES_TOTAL,
            &[("farm", "provence"), ("type", "inverter_failure")]
        ),
        Some(1.0)
    );
    assert!(sink.value(sink::DAILY_REVENUE_EUROS_TOTAL, &[("farm", "provence")]).is_none());
    assert!(sink.value(sink::FARM_TOTAL_POWER_WATTS, &[("farm", "occitanie")]).unwrap() > 0.0);

    // duration 1: healthy again on the next cycle
    let next = engine.run_cycle(june_first(12) + Duration::seconds(30), &sink);
    assert!(!next.reading("provence").unwrap().inverter_down);
    assert_eq!(
        sink.value(sink::INVERTER_STATUS, &[("farm", "provence"), ("inverter_id", "INV01")]),
        Some(1.0)
    );
}

#[test]
fn sensor_loss_zeroes_panel_series() {
    let rng = SequenceRng::new([0.0, 0.5, 0.0], 0.5);
    let mut engine = baseline_engine(steady_config(), rng, june_first(12));
    let sink = MemorySink::new();
    engine.run_cycle(june_first(12), &sink);

    for panel in ["P001", "P005"] {
        let labels = [("farm", "provence"), ("panel_id", panel)];
        assert_eq!(sink.value(sink::POWER_WATTS, &labels), Some(0.0));
        assert_eq!(sink.value(sink::PANEL_TEMPERATURE_CELSIUS, &labels), Some(0.0));
    }
    assert!(sink.value(sink::IRRADIANCE_WM2, &[("farm", "provence")]).unwrap() > 0.0);
    assert!(sink.value(sink::FARM_TOTAL_POWER_WATTS, &[("farm", "provence")]).unwrap() > 0.0);
    let occitanie = [("farm", "occitanie"), ("panel_id", "P001")];
    assert!(sink.value(sink::POWER_WATTS, &occitanie).unwrap() > 0.0);
}

#[test]
fn daily_revenue_resets_once_per_day() {
    let start = june_first(6);
    let mut engine = baseline_engine(steady_config(), quiet_rng(), start);
    let mut clock = SimulatedClock::new(start, 3600, 48);
    let sink = MemorySink::new();
    let reports = run_with_ticker(&mut engine, &mut clock, &sink, |_| {});

    let provence: Vec<_> = reports.iter().map(|r| r.reading("provence").unwrap()).collect();
    let rollovers: Vec<_> = provence
        .iter()
        .enumerate()
        .filter(|(_, r)| r.day_rolled_over)
        .map(|(i, _)| i)
        .collect();
    // 06:00 + 18 h and + 42 h are the midnights of June 2nd and 3rd
    assert_eq!(rollovers, [18, 42]);
    assert_eq!(provence[18].daily_revenue_eur, 0.0);

    for pair in provence[..18].windows(2) {
        assert!(pair[1].daily_revenue_eur >= pair[0].daily_revenue_eur);
    }

    // exported counter keeps growing across the day change
    let exported = sink
        .value(sink::DAILY_REVENUE_EUROS_TOTAL, &[("farm", "provence")])
        .unwrap();
    let earned: f64 = provence.iter().map(|r| r.revenue_eur).sum();
    assert!((exported - earned).abs() < 1e-6);
    assert!(exported > provence[17].daily_revenue_eur);
}

#[test]
fn availability_never_exceeds_one() {
    let start = june_first(8);
    let mut engine = Engine::new(
        SimConfig::default(),
        common::baseline_farms(),
        seeded_rng(Some(3)),
        start,
    );
    let mut clock = SimulatedClock::new(start, 30, 500);
    let reports = run_with_ticker(&mut engine, &mut clock, &MemorySink::new(), |_| {});
    for r in reports.iter().flat_map(|r| &r.readings) {
        assert!((0.0..=1.0).contains(&r.availability), "{}", r.availability);
        assert!(r.production_watts >= 0.0);
    }
}

#[test]
fn seeded_runs_are_reproducible() {
    let run = |seed| {
        let start = june_first(5);
        let mut engine = Engine::new(
            SimConfig::default(),
            common::baseline_farms(),
            seeded_rng(Some(seed)),
            start,
        );
        let mut clock = SimulatedClock::new(start, 120, 400);
        let reports = run_with_ticker(&mut engine, &mut clock, &MemorySink::new(), |_| {});
        RunSummary::from_reports(&reports)
    };
    assert_eq!(run(11), run(11));
    assert!(run(11).anomaly_count() > 0);
}

struct RejectFarm<'a> {
    farm: &'a str,
    inner: MemorySink,
}

impl MetricSink for RejectFarm<'_> {
    fn set_gauge(&self, name: &str, labels: &sink::Labels<'_>, value: f64) -> Result<(), SinkError> {
        if labels.iter().any(|&(k, v)| k == "farm" && v == self.farm) {
            return Err(SinkError::UnknownMetric(name.to_string()));
        }
        self.inner.set_gauge(name, labels, value)
    }

    fn inc_counter(&self, name: &str, labels: &sink::Labels<'_>, delta: f64) -> Result<(), SinkError> {
        self.inner.inc_counter(name, labels, delta)
    }
}

#[test]
fn failing_farm_is_isolated() {
    let mut engine = baseline_engine(steady_config(), quiet_rng(), june_first(12));
    let sink = RejectFarm {
        farm: "occitanie",
        inner: MemorySink::new(),
    };
    let report = engine.step(june_first(12));
    assert_eq!(engine.publish(&report, &sink), 2);

    let total = |farm| sink.inner.value(sink::FARM_TOTAL_POWER_WATTS, &[("farm", farm)]);
    assert!(total("provence").is_some());
    assert!(total("occitanie").is_none());
    assert!(total("aquitaine").is_some());
}

/// Rejects a single gauge series of one farm.
struct FlakyGauge<'a> {
    farm: &'a str,
    metric: &'a str,
    inner: MemorySink,
}

impl MetricSink for FlakyGauge<'_> {
    fn set_gauge(&self, name: &str, labels: &sink::Labels<'_>, value: f64) -> Result<(), SinkError> {
        if name == self.metric && labels.iter().any(|&(k, v)| k == "farm" && v == self.farm) {
            return Err(SinkError::UnknownMetric(name.to_string()));
        }
        self.inner.set_gauge(name, labels, value)
    }

    fn inc_counter(&self, name: &str, labels: &sink::Labels<'_>, delta: f64) -> Result<(), SinkError> {
        self.inner.inc_counter(name, labels, delta)
    }
}

#[test]
fn gauge_failure_keeps_counter_deltas() {
    // provence: inject, shade, duration 1, shade factor; other farms stay quiet
    let rng = SequenceRng::new([0.0, 0.99, 0.0, 0.5], 0.5);
    let mut engine = baseline_engine(steady_config(), rng, june_first(12));
    let sink = FlakyGauge {
        farm: "provence",
        metric: sink::IRRADIANCE_WM2,
        inner: MemorySink::new(),
    };
    let report = engine.step(june_first(12));
    let provence = report.reading("provence").unwrap();
    assert_eq!(provence.injected, Some(AnomalyKind::Shade));
    assert!(provence.revenue_eur > 0.0);

    assert_eq!(engine.publish(&report, &sink), 2);

    let farm = [("farm", "provence")];
    assert!(sink.inner.value(sink::IRRADIANCE_WM2, &farm).is_none());
    let revenue = sink.inner.value(sink::DAILY_REVENUE_EUROS_TOTAL, &farm).unwrap();
    assert!((revenue - provence.revenue_eur).abs() < 1e-9);
    assert_eq!(
        sink.inner.value(sink::ANOMALIES_TOTAL, &[("farm", "provence"), ("type", "shade")]),
        Some(1.0)
    );
    assert_eq!(
        sink.inner.value(sink::INVERTER_STATUS, &[("farm", "provence"), ("inverter_id", "INV01")]),
        Some(1.0)
    );
    assert_eq!(
        sink.inner.value(sink::FARM_TOTAL_POWER_WATTS, &farm),
        Some(provence.production_watts.round())
    );
}

#[test]
fn offline_replay_summary() {
    let start = june_first(0);
    let mut engine = baseline_engine(steady_config(), quiet_rng(), start);
    let mut clock = SimulatedClock::new(start, 3600, 24);
    let reports = run_with_ticker(&mut engine, &mut clock, &MemorySink::new(), |_| {});
    let summary = RunSummary::from_reports(&reports);

    assert_eq!(summary.cycles, 24);
    assert!(summary.total_energy_kwh > 0.0);
    assert!((summary.total_revenue_eur - summary.total_energy_kwh * 0.18).abs() < 1e-6);
    let noon = reports[12].total_production_watts();
    assert_eq!(summary.peak_fleet_watts, noon);
    assert_eq!(summary.min_availability.len(), 3);
}
