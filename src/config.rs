//! TOML-based simulator configuration and preset definitions.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::sim::anomaly::AnomalyPolicy;
use crate::sim::physics::PanelRating;
use crate::sim::types::{Farm, SimConfig, sample_panel_ids};

/// Longest accepted cycle interval.
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// Top-level simulator configuration parsed from TOML.
///
/// All fields have defaults matching the baseline fleet. Load from TOML with
/// [`SimulatorConfig::from_toml_file`] or use [`SimulatorConfig::baseline`]
/// for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Cycle timing, tariff and panel parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Anomaly injection parameters.
    #[serde(default)]
    pub anomalies: AnomalyConfig,
    /// HTTP exposition parameters.
    #[serde(default)]
    pub server: ServerConfig,
    /// Fleet definition, in publication order.
    #[serde(default = "baseline_farms")]
    pub farms: Vec<FarmConfig>,
}

/// Cycle timing, tariff and panel parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Seconds between cycles (1 to [`MAX_INTERVAL_SECS`]).
    pub interval_secs: u64,
    /// Feed-in tariff (€/kWh).
    pub tariff_eur_per_kwh: f64,
    /// Nameplate power of one panel (W).
    pub panel_peak_watts: f64,
    /// Overall system efficiency (0.0, 1.0].
    pub system_efficiency: f64,
    /// Number of sample panels published per farm.
    pub sample_panel_count: usize,
    /// Inverter identifiers published per farm.
    pub inverter_ids: Vec<String>,
    /// Jitter the daily irradiance peak each cycle.
    pub irradiance_jitter: bool,
    /// Random seed; OS entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            tariff_eur_per_kwh: 0.18,
            panel_peak_watts: PanelRating::STANDARD.peak_watts,
            system_efficiency: PanelRating::STANDARD.system_efficiency,
            sample_panel_count: 5,
            inverter_ids: vec!["INV01".into(), "INV02".into(), "INV03".into()],
            irradiance_jitter: true,
            seed: None,
        }
    }
}

/// Anomaly injection parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnomalyConfig {
    /// Probability of injecting an anomaly per farm per cycle (0.0 to 1.0).
    pub injection_probability: f64,
    /// Longest anomaly, in cycles (>= 1).
    pub max_duration_cycles: u32,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        let policy = AnomalyPolicy::default();
        Self {
            injection_probability: policy.injection_probability,
            max_duration_cycles: policy.max_duration_cycles,
        }
    }
}

/// HTTP exposition parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 9100 }
    }
}

/// One farm entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FarmConfig {
    /// Identifier used as the `farm` label (unique, non-empty).
    pub id: String,
    /// Display name; defaults to the id.
    #[serde(default)]
    pub name: Option<String>,
    /// Installed panel count (> 0).
    pub panels: u32,
    /// Location label.
    #[serde(default)]
    pub location: String,
    /// Ambient temperature offset (°C).
    #[serde(default)]
    pub ambient_offset_c: f64,
}

impl FarmConfig {
    fn new(id: &str, panels: u32, location: &str, ambient_offset_c: f64) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            panels,
            location: location.to_string(),
            ambient_offset_c,
        }
    }
}

fn baseline_farms() -> Vec<FarmConfig> {
    vec![
        FarmConfig::new("provence", 5000, "Marseille", 2.0),
        FarmConfig::new("occitanie", 3500, "Montpellier", 1.0),
        FarmConfig::new("aquitaine", 4200, "Bordeaux", 0.0),
    ]
}

/// Configuration error with field path and constraint description.
#[derive(Debug, thiserror::Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.interval_secs"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::baseline()
    }
}

impl SimulatorConfig {
    /// Returns the baseline fleet: provence, occitanie and aquitaine.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            anomalies: AnomalyConfig::default(),
            server: ServerConfig::default(),
            farms: baseline_farms(),
        }
    }

    /// Returns the calm preset: baseline fleet with no anomaly injection.
    pub fn calm() -> Self {
        Self {
            anomalies: AnomalyConfig {
                injection_probability: 0.0,
                ..AnomalyConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Returns the stormy preset: frequent, long anomalies.
    pub fn stormy() -> Self {
        Self {
            anomalies: AnomalyConfig {
                injection_probability: 0.30,
                max_duration_cycles: 20,
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "calm", "stormy"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "calm" => Ok(Self::calm()),
            "stormy" => Ok(Self::stormy()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.interval_secs == 0 {
            errors.push(ConfigError::new("simulation.interval_secs", "must be > 0"));
        } else if s.interval_secs > MAX_INTERVAL_SECS {
            errors.push(ConfigError::new(
                "simulation.interval_secs",
                format!("must be <= {MAX_INTERVAL_SECS} (one day)"),
            ));
        }
        if !(s.tariff_eur_per_kwh >= 0.0) {
            errors.push(ConfigError::new("simulation.tariff_eur_per_kwh", "must be >= 0"));
        }
        if !(s.panel_peak_watts > 0.0) {
            errors.push(ConfigError::new("simulation.panel_peak_watts", "must be > 0"));
        }
        if !(s.system_efficiency > 0.0 && s.system_efficiency <= 1.0) {
            errors.push(ConfigError::new(
                "simulation.system_efficiency",
                "must be in (0.0, 1.0]",
            ));
        }
        if s.inverter_ids.is_empty() {
            errors.push(ConfigError::new(
                "simulation.inverter_ids",
                "must list at least one inverter",
            ));
        }

        let a = &self.anomalies;
        if !(0.0..=1.0).contains(&a.injection_probability) {
            errors.push(ConfigError::new(
                "anomalies.injection_probability",
                "must be in [0.0, 1.0]",
            ));
        }
        if a.max_duration_cycles == 0 {
            errors.push(ConfigError::new("anomalies.max_duration_cycles", "must be >= 1"));
        }

        if self.farms.is_empty() {
            errors.push(ConfigError::new("farms", "must define at least one farm"));
        }
        let mut seen = HashSet::new();
        for (i, farm) in self.farms.iter().enumerate() {
            if farm.id.trim().is_empty() {
                errors.push(ConfigError::new(format!("farms[{i}].id"), "must not be empty"));
            } else if !seen.insert(farm.id.as_str()) {
                errors.push(ConfigError::new(
                    format!("farms[{i}].id"),
                    format!("duplicate farm id \"{}\"", farm.id),
                ));
            }
            if farm.panels == 0 {
                errors.push(ConfigError::new(format!("farms[{i}].panels"), "must be > 0"));
            }
        }

        errors
    }

    /// Builds the engine settings.
    pub fn to_sim_config(&self) -> SimConfig {
        let s = &self.simulation;
        SimConfig {
            interval_secs: s.interval_secs,
            tariff_eur_per_kwh: s.tariff_eur_per_kwh,
            rating: PanelRating {
                peak_watts: s.panel_peak_watts,
                system_efficiency: s.system_efficiency,
            },
            panel_ids: sample_panel_ids(s.sample_panel_count),
            inverter_ids: s.inverter_ids.clone(),
            irradiance_jitter: s.irradiance_jitter,
            anomalies: AnomalyPolicy {
                injection_probability: self.anomalies.injection_probability,
                max_duration_cycles: self.anomalies.max_duration_cycles,
            },
        }
    }

    /// Builds the fleet definition, in configuration order.
    pub fn farms(&self) -> Vec<Farm> {
        self.farms
            .iter()
            .map(|f| {
                Farm::new(
                    f.id.clone(),
                    f.name.clone().unwrap_or_else(|| f.id.clone()),
                    f.panels,
                    f.location.clone(),
                    f.ambient_offset_c,
                )
            })
            .collect()
    }

    /// Resolves the listening port: CLI flag, then `PORT` value, then config.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `env_port` is set but not a valid port.
    pub fn resolve_port(
        &self,
        cli_port: Option<u16>,
        env_port: Option<&str>,
    ) -> Result<u16, ConfigError> {
        if let Some(port) = cli_port {
            return Ok(port);
        }
        match env_port.map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::new("PORT", format!("invalid port \"{raw}\""))),
            None => Ok(self.server.port),
        }
    }
}
