//! Physical production model: irradiance, temperatures, and PV output.
//!
//! Every function here is pure. Randomness (irradiance jitter) is applied by
//! the engine before calling into this module.

use std::f64::consts::PI;

/// Irradiance at standard test conditions (W/m²).
pub const STC_IRRADIANCE_WM2: f64 = 1000.0;
/// Reference cell temperature for the derating curve (°C).
pub const REFERENCE_TEMP_C: f64 = 25.0;
/// Power temperature coefficient (fraction per °C).
pub const TEMP_COEFFICIENT: f64 = -0.0035;
/// Panel heating above ambient at full irradiance (°C).
pub const PANEL_HEATING_C: f64 = 30.0;

/// First hour with daylight (inclusive).
const SUNRISE_HOUR: f64 = 6.0;
/// First hour of darkness (exclusive end of the daylight window).
const SUNSET_HOUR: f64 = 18.0;

/// Position inside the daylight window as a half-sine, 0 at sunrise and
/// sunset, 1 at solar noon.
fn daylight_shape(hour: f64) -> f64 {
    (PI * (hour - SUNRISE_HOUR) / (SUNSET_HOUR - SUNRISE_HOUR)).sin()
}

/// Global horizontal irradiance (W/m²) at the given UTC hour.
///
/// Returns 0 outside `[6, 18)`. Inside the window the value follows a
/// bell curve that peaks at hour 12 with `irradiance_max`.
///
/// # Examples
///
/// ```
/// use solar_farm_sim::sim::physics::irradiance_at_hour;
///
/// assert_eq!(irradiance_at_hour(5.0, 1000.0), 0.0);
/// assert!((irradiance_at_hour(12.0, 1000.0) - 1000.0).abs() < 1e-9);
/// ```
pub fn irradiance_at_hour(hour: f64, irradiance_max: f64) -> f64 {
    if !(SUNRISE_HOUR..SUNSET_HOUR).contains(&hour) {
        return 0.0;
    }
    (irradiance_max * daylight_shape(hour)).max(0.0)
}

/// Ambient air temperature (°C) at the given hour, rounded to one decimal.
///
/// Follows the same half-sine as irradiance on a 10–30 °C band, shifted by a
/// fixed per-farm `offset_c` standing in for latitude.
pub fn ambient_temperature(hour: f64, offset_c: f64) -> f64 {
    let base = 10.0 + 20.0 * daylight_shape(hour);
    ((base + offset_c) * 10.0).round() / 10.0
}

/// Panel temperature (°C): ambient plus up to 30 °C at full irradiance.
pub fn panel_temperature(ambient_c: f64, irradiance: f64) -> f64 {
    ambient_c + (irradiance / STC_IRRADIANCE_WM2) * PANEL_HEATING_C
}

/// Linear efficiency derating relative to 25 °C.
///
/// Exactly 1.0 at the reference temperature, above 1.0 for colder panels.
pub fn temperature_factor(panel_temp_c: f64) -> f64 {
    1.0 + (panel_temp_c - REFERENCE_TEMP_C) * TEMP_COEFFICIENT
}

/// Nameplate characteristics shared by every panel of the fleet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelRating {
    /// Peak power of one panel at STC (W).
    pub peak_watts: f64,
    /// Balance-of-system efficiency (0.0 to 1.0).
    pub system_efficiency: f64,
}

impl PanelRating {
    /// 400 Wp panels behind an 85 % efficient system.
    pub const STANDARD: Self = Self {
        peak_watts: 400.0,
        system_efficiency: 0.85,
    };

    /// Installed peak capacity of `panel_count` panels (W).
    pub fn installed_watts(&self, panel_count: u32) -> f64 {
        f64::from(panel_count) * self.peak_watts
    }

    /// Theoretical farm output (W) before anomaly effects.
    ///
    /// # Arguments
    ///
    /// * `panel_count` - Number of panels in the farm
    /// * `irradiance` - Irradiance on the panels (W/m²)
    /// * `panel_temp_c` - Panel temperature (°C)
    ///
    /// # Returns
    ///
    /// Output power in watts, never negative.
    pub fn theoretical_production_watts(
        &self,
        panel_count: u32,
        irradiance: f64,
        panel_temp_c: f64,
    ) -> f64 {
        let watts = self.installed_watts(panel_count)
            * (irradiance / STC_IRRADIANCE_WM2)
            * self.system_efficiency
            * temperature_factor(panel_temp_c);
        watts.max(0.0)
    }
}

impl Default for PanelRating {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Theoretical output (W) of `panel_count` standard-rated panels.
pub fn theoretical_production_watts(panel_count: u32, irradiance: f64, panel_temp_c: f64) -> f64 {
    PanelRating::STANDARD.theoretical_production_watts(panel_count, irradiance, panel_temp_c)
}
