//! Session runner for boat ride experiments.
//!
//! Orchestrates the experiment lifecycle:
//! 1. Validate the fleet and crowd sizes
//! 2. Run the session with the chosen progress sink
//! 3. Collect timings and ride metrics into a report

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use ride_kernel::{ProgressSink, Session, SessionConfig, SessionEvent, TracingSink};
use tracing::{debug, info};

use crate::results::{SessionReport, SweepResults};

/// Logs progress events at debug level, for sweeps with many sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuietSink;

impl ProgressSink for QuietSink {
    fn record(&self, event: SessionEvent) {
        debug!(?event, "session event");
    }
}

/// Configuration for the session runner.
#[derive(Debug, Clone)]
pub struct SessionRunnerConfig {
    /// Wall-clock length of one simulated minute
    pub minute: Duration,
    /// Claim retry delay for searching visitors
    pub claim_backoff: Duration,
    /// Log every progress event at info level
    pub narrate: bool,
}

impl Default for SessionRunnerConfig {
    fn default() -> Self {
        Self {
            minute: Duration::from_millis(100),
            claim_backoff: Duration::from_millis(1),
            narrate: true,
        }
    }
}

/// The session runner.
pub struct SessionRunner {
    config: SessionRunnerConfig,
}

impl SessionRunner {
    pub fn new(config: SessionRunnerConfig) -> Self {
        Self { config }
    }

    /// Build a validated session configuration for this runner.
    pub fn session_config(
        &self,
        boats: usize,
        visitors: usize,
        seed: Option<u64>,
    ) -> Result<SessionConfig> {
        let config = SessionConfig::new(boats, visitors)?
            .with_minute(self.config.minute)
            .with_seed(seed)
            .with_claim_backoff(self.config.claim_backoff)?;
        Ok(config)
    }

    /// Run a single session.
    pub async fn run(
        &self,
        boats: usize,
        visitors: usize,
        trial: usize,
        seed: Option<u64>,
    ) -> Result<SessionReport> {
        let config = self.session_config(boats, visitors, seed)?;
        let sink: Arc<dyn ProgressSink> = if self.config.narrate {
            Arc::new(TracingSink)
        } else {
            Arc::new(QuietSink)
        };

        let started_at = Utc::now();
        let outcome = Session::new(config.clone())
            .with_sink(sink)
            .run()
            .await
            .with_context(|| format!("session with {boats} boats and {visitors} visitors"))?;
        let ended_at = Utc::now();

        Ok(SessionReport::new(&config, trial, outcome, started_at, ended_at))
    }

    /// Run every (boats, visitors) combination `trials` times.
    ///
    /// Configurations are validated up front so a bad value fails the sweep
    /// before any session starts.
    pub async fn sweep(
        &self,
        boats: &[usize],
        visitors: &[usize],
        trials: usize,
    ) -> Result<SweepResults> {
        for &b in boats {
            for &v in visitors {
                self.session_config(b, v, None)?;
            }
        }

        let mut results = SweepResults::new();
        let total = boats.len() * visitors.len() * trials;
        let mut completed = 0;

        for &b in boats {
            for &v in visitors {
                for trial in 0..trials {
                    let report = self.run(b, v, trial, None).await?;
                    results.add(report);
                    completed += 1;

                    info!(
                        progress = format!("{}/{}", completed, total),
                        boats = b,
                        visitors = v,
                        trial = trial,
                        "Completed session"
                    );
                }
            }
        }

        results.compute_summary();
        Ok(results)
    }
}
