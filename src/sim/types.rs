//! Core simulation types: fleet definition, engine settings, and cycle records.

use std::fmt;

use chrono::{DateTime, Utc};

use super::anomaly::{AnomalyKind, AnomalyPolicy};
use super::physics::PanelRating;

/// Static description of one solar farm.
#[derive(Debug, Clone, PartialEq)]
pub struct Farm {
    /// Stable identifier, used as the `farm` metric label.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Number of installed panels.
    pub panel_count: u32,
    /// Free-form location label.
    pub location: String,
    /// Fixed ambient temperature offset (°C) standing in for latitude.
    pub ambient_offset_c: f64,
}

impl Farm {
    /// Creates a farm description.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        panel_count: u32,
        location: impl Into<String>,
        ambient_offset_c: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            panel_count,
            location: location.into(),
            ambient_offset_c,
        }
    }
}

/// Engine settings, static for the process lifetime.
///
/// # Examples
///
/// ```
/// use solar_farm_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::default();
/// assert_eq!(cfg.interval_secs, 30);
/// assert_eq!(cfg.panel_ids, ["P001", "P002", "P003", "P004", "P005"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Length of one cycle in seconds.
    pub interval_secs: u64,
    /// Feed-in tariff (€/kWh).
    pub tariff_eur_per_kwh: f64,
    /// Panel nameplate used for production and efficiency.
    pub rating: PanelRating,
    /// Sample panel identifiers published per farm.
    pub panel_ids: Vec<String>,
    /// Inverter identifiers published per farm. The first one is the unit
    /// that reports a failure.
    pub inverter_ids: Vec<String>,
    /// Whether the daily irradiance peak is jittered each cycle.
    pub irradiance_jitter: bool,
    /// Anomaly injection policy.
    pub anomalies: AnomalyPolicy,
}

impl SimConfig {
    /// Cycle length in hours.
    pub fn interval_hours(&self) -> f64 {
        self.interval_secs as f64 / 3600.0
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            tariff_eur_per_kwh: 0.18,
            rating: PanelRating::STANDARD,
            panel_ids: sample_panel_ids(5),
            inverter_ids: vec!["INV01".into(), "INV02".into(), "INV03".into()],
            irradiance_jitter: true,
            anomalies: AnomalyPolicy::default(),
        }
    }
}

/// Generates `P001`, `P002`, ... sample panel identifiers.
pub fn sample_panel_ids(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("P{i:03}")).collect()
}

/// Values computed for one farm in one cycle, mutated by anomaly effects.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleMetrics {
    /// Irradiance (W/m², >= 0).
    pub irradiance: f64,
    /// Panel temperature (°C).
    pub panel_temperature: f64,
    /// Farm output (W, >= 0).
    pub production_total_watts: f64,
    /// Set when an inverter failure is active this cycle.
    pub inverter_down: bool,
    /// Set when per-panel sensors are lost this cycle.
    pub sensor_loss: bool,
}

impl CycleMetrics {
    /// Starts from theoretical values with no fault flags.
    pub fn new(irradiance: f64, panel_temperature: f64, production_total_watts: f64) -> Self {
        Self {
            irradiance,
            panel_temperature,
            production_total_watts,
            inverter_down: false,
            sensor_loss: false,
        }
    }
}

/// Everything derived for one farm during one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct FarmReading {
    /// Farm identifier.
    pub farm_id: String,
    /// UTC hour used by the physical model.
    pub hour: u32,
    /// Irradiance (W/m²).
    pub irradiance: f64,
    /// Ambient temperature (°C).
    pub ambient_c: f64,
    /// Panel temperature after anomaly effects (°C).
    pub panel_temp_c: f64,
    /// Output before anomaly effects (W).
    pub theoretical_watts: f64,
    /// Output after anomaly effects (W).
    pub production_watts: f64,
    /// Whether an inverter failure was active.
    pub inverter_down: bool,
    /// Whether per-panel readings were suppressed.
    pub sensor_loss: bool,
    /// Anomaly injected this cycle, if any.
    pub injected: Option<AnomalyKind>,
    /// Anomalies still active after aging.
    pub active_anomalies: usize,
    /// Per-panel temperature as published (0 under sensor loss).
    pub published_panel_temp_c: f64,
    /// Per-panel power as published (0 under sensor loss).
    pub published_panel_watts: f64,
    /// `(inverter_id, status)` pairs; 1 = OK, 0 = failed.
    pub inverter_statuses: Vec<(String, u8)>,
    /// Energy produced during the interval (kWh).
    pub energy_kwh: f64,
    /// Revenue earned during the interval (€).
    pub revenue_eur: f64,
    /// Revenue accumulated since the last UTC day change (€).
    pub daily_revenue_eur: f64,
    /// Credited uptime since start (s).
    pub uptime_secs: f64,
    /// Uptime over elapsed time (0.0 to 1.0).
    pub availability: f64,
    /// Output relative to installed peak (%).
    pub efficiency_pct: f64,
    /// Whether this cycle crossed a UTC day boundary.
    pub day_rolled_over: bool,
}

impl fmt::Display for FarmReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10} h={:>2} | irr={:>7.1} W/m2  Tpanel={:>5.1}C | P={:>11.0} W (theo {:>11.0}) \
             eff={:>5.2}% | rev={:.4} EUR (day {:.2}) avail={:.3}",
            self.farm_id,
            self.hour,
            self.irradiance,
            self.panel_temp_c,
            self.production_watts,
            self.theoretical_watts,
            self.efficiency_pct,
            self.revenue_eur,
            self.daily_revenue_eur,
            self.availability,
        )?;
        if self.inverter_down {
            write!(f, " INV-DOWN")?;
        }
        if self.sensor_loss {
            write!(f, " SENSOR-LOSS")?;
        }
        if let Some(kind) = self.injected {
            write!(f, " +{kind}")?;
        }
        if self.active_anomalies > 0 {
            write!(f, " active={}", self.active_anomalies)?;
        }
        Ok(())
    }
}

/// All farm readings produced by one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Tick index (0-based).
    pub index: u64,
    /// Tick timestamp.
    pub at: DateTime<Utc>,
    /// One reading per farm, in fleet order.
    pub readings: Vec<FarmReading>,
}

impl CycleReport {
    /// Looks up the reading for `farm_id`.
    pub fn reading(&self, farm_id: &str) -> Option<&FarmReading> {
        self.readings.iter().find(|r| r.farm_id == farm_id)
    }

    /// Fleet output this cycle (W).
    pub fn total_production_watts(&self) -> f64 {
        self.readings.iter().map(|r| r.production_watts).sum()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "cycle {} @ {}",
            self.index,
            self.at.format("%Y-%m-%dT%H:%M:%SZ")
        )?;
        for r in &self.readings {
            writeln!(f, "  {r}")?;
        }
        Ok(())
    }
}
