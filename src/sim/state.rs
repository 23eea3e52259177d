//! Per-farm running state carried across cycles.

use chrono::{DateTime, Datelike, Utc};

use super::anomaly::Anomaly;

/// Mutable per-farm record owned by the engine.
///
/// Only the engine mutates it, once per farm per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FarmState {
    pub(crate) active_anomalies: Vec<Anomaly>,
    uptime_secs: f64,
    daily_revenue_eur: f64,
    last_reset_day: u32,
    started_at: DateTime<Utc>,
}

impl FarmState {
    /// Creates an empty state anchored at `started_at`.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            active_anomalies: Vec::new(),
            uptime_secs: 0.0,
            daily_revenue_eur: 0.0,
            last_reset_day: started_at.day(),
            started_at,
        }
    }

    /// Active anomalies in injection order.
    pub fn active_anomalies(&self) -> &[Anomaly] {
        &self.active_anomalies
    }

    /// Credited uptime (s).
    pub fn uptime_secs(&self) -> f64 {
        self.uptime_secs
    }

    /// Revenue accumulated since the last UTC day change (€).
    pub fn daily_revenue_eur(&self) -> f64 {
        self.daily_revenue_eur
    }

    /// UTC day-of-month last seen.
    pub fn last_reset_day(&self) -> u32 {
        self.last_reset_day
    }

    /// Creation time.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Seconds elapsed between creation and `now`, never negative.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.started_at).num_milliseconds();
        (millis.max(0) as f64) / 1000.0
    }

    /// Credits one interval of uptime, capped at the elapsed time.
    pub(crate) fn credit_uptime(&mut self, interval_secs: f64, now: DateTime<Utc>) {
        let elapsed = self.elapsed_secs(now);
        self.uptime_secs = (self.uptime_secs + interval_secs)
            .min(elapsed)
            .max(self.uptime_secs);
    }

    /// Adds positive revenue to the daily total; other values are ignored.
    pub(crate) fn accumulate_revenue(&mut self, revenue_eur: f64) {
        if revenue_eur > 0.0 {
            self.daily_revenue_eur += revenue_eur;
        }
    }

    /// Resets the daily total when the UTC day-of-month changed.
    ///
    /// Returns `true` when a reset happened.
    pub(crate) fn roll_over_day(&mut self, now: DateTime<Utc>) -> bool {
        let today = now.day();
        if today == self.last_reset_day {
            return false;
        }
        self.last_reset_day = today;
        self.daily_revenue_eur = 0.0;
        true
    }

    /// Uptime over elapsed time, 1.0 when no time has elapsed yet.
    pub fn availability(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = self.elapsed_secs(now);
        if elapsed > 0.0 {
            self.uptime_secs / elapsed
        } else {
            1.0
        }
    }
}
