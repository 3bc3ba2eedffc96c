//! Results collection and output for boat ride sessions.
//!
//! Captures per-session metrics like:
//! - Wall-clock time to serve every visitor
//! - Rides per boat and peak concurrent rides
//! - Claim retries (visitors released before any boat was open)

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use ride_kernel::{RideRecord, SessionConfig, SessionOutcome};
use serde::{Deserialize, Serialize};

/// Configuration a session ran with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of boats
    pub boats: usize,
    /// Number of visitors
    pub visitors: usize,
    /// Wall-clock microseconds per simulated minute
    pub minute_us: u64,
    /// Trial number (for repeated sessions)
    pub trial: usize,
    /// Seed the visitor durations were drawn from
    pub seed: u64,
}

/// Results from a single session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub config: ReportConfig,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Wall-clock duration of the session
    pub elapsed_ms: u64,
    pub visitors_served: usize,
    /// Boat that served the last visitor and closed the session
    pub closed_by: usize,
    pub peak_concurrent_rides: usize,
    pub claim_retries: u64,
    /// Rides per boat, index 0 is boat 1
    pub rides_per_boat: Vec<usize>,
    /// Rides in completion order
    pub rides: Vec<RideRecord>,
}

impl SessionReport {
    /// Build a report from a finished session.
    pub fn new(
        config: &SessionConfig,
        trial: usize,
        outcome: SessionOutcome,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        Self {
            config: ReportConfig {
                boats: config.boats(),
                visitors: config.visitors(),
                minute_us: config.minute().as_micros() as u64,
                trial,
                seed: outcome.seed,
            },
            started_at,
            ended_at,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
            visitors_served: outcome.visitors_served,
            closed_by: outcome.closed_by.0,
            peak_concurrent_rides: outcome.peak_concurrent_rides,
            claim_retries: outcome.claim_retries,
            rides_per_boat: outcome.rides_per_boat(config.boats()),
            rides: outcome.rides,
        }
    }

    /// Total simulated ride minutes across every boat.
    pub fn total_ride_minutes(&self) -> u64 {
        self.rides.iter().map(|r| r.ride_minutes as u64).sum()
    }

    /// Save the report to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Aggregate results from a sweep over fleet and crowd sizes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepResults {
    /// All individual session reports
    pub results: Vec<SessionReport>,
    /// Summary statistics by configuration
    pub summary: BTreeMap<String, ConfigSummary>,
}

/// Summary statistics for one (boats, visitors) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub config_key: String,
    pub trials: usize,
    pub avg_elapsed_ms: f64,
    /// Standard error of avg_elapsed_ms
    pub elapsed_ms_se: f64,
    pub avg_claim_retries: f64,
    /// Fraction of boat capacity in use at the busiest instant, averaged
    pub avg_peak_utilization: f64,
    pub max_peak_concurrent_rides: usize,
    /// Largest share of a session's rides taken by a single boat
    pub max_rides_share: f64,
}

impl SweepResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, report: SessionReport) {
        self.results.push(report);
    }

    /// Compute summary statistics.
    pub fn compute_summary(&mut self) {
        let mut by_config: BTreeMap<String, Vec<&SessionReport>> = BTreeMap::new();

        for report in &self.results {
            let key = format!(
                "boats={}:visitors={}",
                report.config.boats, report.config.visitors
            );
            by_config.entry(key).or_default().push(report);
        }

        self.summary.clear();
        for (key, reports) in by_config {
            let trials = reports.len();
            let n = trials as f64;

            let elapsed: Vec<f64> = reports.iter().map(|r| r.elapsed_ms as f64).collect();
            let avg_elapsed_ms = elapsed.iter().sum::<f64>() / n;

            // Standard error for continuous: SE = std_dev / sqrt(n)
            let elapsed_ms_se = if trials > 1 {
                let variance = elapsed
                    .iter()
                    .map(|t| (t - avg_elapsed_ms).powi(2))
                    .sum::<f64>()
                    / (n - 1.0);
                variance.sqrt() / n.sqrt()
            } else {
                0.0
            };

            let avg_claim_retries =
                reports.iter().map(|r| r.claim_retries as f64).sum::<f64>() / n;

            let avg_peak_utilization = reports
                .iter()
                .map(|r| r.peak_concurrent_rides as f64 / r.config.boats as f64)
                .sum::<f64>()
                / n;

            let max_peak_concurrent_rides = reports
                .iter()
                .map(|r| r.peak_concurrent_rides)
                .max()
                .unwrap_or(0);

            let max_rides_share = reports
                .iter()
                .filter(|r| r.visitors_served > 0)
                .map(|r| {
                    let busiest = r.rides_per_boat.iter().copied().max().unwrap_or(0);
                    busiest as f64 / r.visitors_served as f64
                })
                .fold(0.0, f64::max);

            self.summary.insert(
                key.clone(),
                ConfigSummary {
                    config_key: key,
                    trials,
                    avg_elapsed_ms,
                    elapsed_ms_se,
                    avg_claim_retries,
                    avg_peak_utilization,
                    max_peak_concurrent_rides,
                    max_rides_share,
                },
            );
        }
    }

    /// Save results to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let results = serde_json::from_str(&json)?;
        Ok(results)
    }
}

/// Format a duration in milliseconds for display.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{:.1}m", ms as f64 / 60_000.0)
    }
}
