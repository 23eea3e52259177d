//! Post-hoc summary computed from the cycle reports of a run.

use std::collections::BTreeMap;
use std::fmt;

use super::anomaly::AnomalyKind;
use super::types::CycleReport;

/// Aggregate figures derived from a complete run.
///
/// Computed from `&[CycleReport]` after the fact, so the summary always agrees
/// with the per-cycle records.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Number of cycles.
    pub cycles: usize,
    /// Fleet energy produced (kWh).
    pub total_energy_kwh: f64,
    /// Fleet revenue earned (€).
    pub total_revenue_eur: f64,
    /// Highest fleet output seen in a single cycle (W).
    pub peak_fleet_watts: f64,
    /// Injected anomalies per kind.
    pub anomalies: BTreeMap<AnomalyKind, usize>,
    /// Lowest availability per farm, in fleet order.
    pub min_availability: Vec<(String, f64)>,
}

impl RunSummary {
    /// Computes the summary of a run.
    ///
    /// # Arguments
    ///
    /// * `reports` - Every cycle of the run, in order
    ///
    /// # Returns
    ///
    /// A `RunSummary`; all figures are zero for an empty run.
    pub fn from_reports(reports: &[CycleReport]) -> Self {
        let mut total_energy_kwh = 0.0;
        let mut total_revenue_eur = 0.0;
        let mut peak_fleet_watts = 0.0_f64;
        let mut anomalies = BTreeMap::new();
        let mut min_availability: Vec<(String, f64)> = Vec::new();

        for report in reports {
            peak_fleet_watts = peak_fleet_watts.max(report.total_production_watts());
            for r in &report.readings {
                total_energy_kwh += r.energy_kwh;
                total_revenue_eur += r.revenue_eur;
                if let Some(kind) = r.injected {
                    *anomalies.entry(kind).or_insert(0) += 1;
                }
                match min_availability.iter_mut().find(|(id, _)| *id == r.farm_id) {
                    Some((_, min)) => *min = min.min(r.availability),
                    None => min_availability.push((r.farm_id.clone(), r.availability)),
                }
            }
        }

        Self {
            cycles: reports.len(),
            total_energy_kwh,
            total_revenue_eur,
            peak_fleet_watts,
            anomalies,
            min_availability,
        }
    }

    /// Total injected anomalies across kinds.
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.values().sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Summary ---")?;
        writeln!(f, "Cycles:              {}", self.cycles)?;
        writeln!(f, "Energy produced:     {:.3} kWh", self.total_energy_kwh)?;
        writeln!(f, "Revenue:             {:.2} EUR", self.total_revenue_eur)?;
        writeln!(f, "Peak fleet power:    {:.0} W", self.peak_fleet_watts)?;
        write!(f, "Anomalies injected:  {}", self.anomaly_count())?;
        for (kind, count) in &self.anomalies {
            write!(f, "\n  {kind:<18} {count}")?;
        }
        for (farm, avail) in &self.min_availability {
            write!(f, "\nMin availability {farm}: {avail:.3}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::FarmReading;
    use chrono::{TimeZone, Utc};

    fn reading(id: &str, watts: f64, avail: f64, injected: Option<AnomalyKind>) -> FarmReading {
        FarmReading {
            farm_id: id.to_string(),
            hour: 12,
            irradiance: 1000.0,
            ambient_c: 30.0,
            panel_temp_c: 60.0,
            theoretical_watts: watts,
            production_watts: watts,
            inverter_down: false,
            sensor_loss: false,
            injected,
            active_anomalies: 0,
            published_panel_temp_c: 60.0,
            published_panel_watts: 0.0,
            inverter_statuses: Vec::new(),
            energy_kwh: watts / 1000.0,
            revenue_eur: watts / 1000.0 * 0.18,
            daily_revenue_eur: 0.0,
            uptime_secs: 0.0,
            availability: avail,
            efficiency_pct: 0.0,
            day_rolled_over: false,
        }
    }

    fn report(index: u64, readings: Vec<FarmReading>) -> CycleReport {
        CycleReport {
            index,
            at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            readings,
        }
    }

    #[test]
    fn empty_run_is_zero() {
        let s = RunSummary::from_reports(&[]);
        assert_eq!(s.cycles, 0);
        assert_eq!(s.total_energy_kwh, 0.0);
        assert_eq!(s.peak_fleet_watts, 0.0);
        assert!(s.anomalies.is_empty());
        assert!(s.min_availability.is_empty());
    }

    #[test]
    fn aggregates_across_cycles() {
        let reports = vec![
            report(
                0,
                vec![
                    reading("a", 1000.0, 1.0, None),
                    reading("b", 500.0, 1.0, Some(AnomalyKind::Shade)),
                ],
            ),
            report(
                1,
                vec![
                    reading("a", 3000.0, 0.5, Some(AnomalyKind::Shade)),
                    reading("b", 0.0, 0.9, Some(AnomalyKind::InverterFailure)),
                ],
            ),
        ];
        let s = RunSummary::from_reports(&reports);

        assert_eq!(s.cycles, 2);
        assert!((s.total_energy_kwh - 4.5).abs() < 1e-12);
        assert!((s.total_revenue_eur - 4.5 * 0.18).abs() < 1e-12);
        assert_eq!(s.peak_fleet_watts, 3000.0);
        assert_eq!(s.anomalies.get(&AnomalyKind::Shade), Some(&2));
        assert_eq!(s.anomaly_count(), 3);
        assert_eq!(
            s.min_availability,
            vec![("a".to_string(), 0.5), ("b".to_string(), 0.9)]
        );
    }

    #[test]
    fn display_lists_farms() {
        let s = RunSummary::from_reports(&[report(0, vec![reading("provence", 10.0, 1.0, None)])]);
        let text = s.to_string();
        assert!(text.starts_with("--- Run Summary ---"));
        assert!(text.contains("Min availability provence: 1.000"));
    }
}
