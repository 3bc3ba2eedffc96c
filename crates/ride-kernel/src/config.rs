//! Configuration types for a ride session.

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Allowed number of boats in a session.
pub const BOAT_RANGE: RangeInclusive<usize> = 5..=10;

/// Allowed number of visitors in a session.
pub const VISITOR_RANGE: RangeInclusive<usize> = 20..=100;

/// Sightseeing time drawn by each visitor, in simulated minutes.
pub const TOUR_MINUTES: RangeInclusive<u32> = 30..=120;

/// Desired ride time drawn by each visitor, in simulated minutes.
pub const RIDE_MINUTES: RangeInclusive<u32> = 15..=60;

/// Floor for the claim loop retry delay.
pub const MIN_CLAIM_BACKOFF: Duration = Duration::from_micros(200);

/// Rejected session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("boat count {boats} out of range: must be {min}-{max}")]
    BoatsOutOfRange {
        boats: usize,
        min: usize,
        max: usize,
    },

    #[error("visitor count {visitors} out of range: must be {min}-{max}")]
    VisitorsOutOfRange {
        visitors: usize,
        min: usize,
        max: usize,
    },

    #[error("claim backoff {backoff:?} is below the {min:?} floor")]
    BackoffTooShort { backoff: Duration, min: Duration },
}

/// Immutable parameters of one session.
///
/// Only constructible through [`SessionConfig::new`] (or `Default`), so a
/// value of this type always satisfies the boat and visitor bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    /// Number of boats (m)
    boats: usize,

    /// Number of visitors (n)
    visitors: usize,

    /// Wall-clock length of one simulated minute
    minute: Duration,

    /// Delay between two claim attempts of a searching visitor
    claim_backoff: Duration,

    /// Seed for visitor duration draws (None = fresh entropy per session)
    seed: Option<u64>,
}

impl SessionConfig {
    /// Validate boat and visitor counts.
    pub fn new(boats: usize, visitors: usize) -> Result<Self, ConfigError> {
        if !BOAT_RANGE.contains(&boats) {
            return Err(ConfigError::BoatsOutOfRange {
                boats,
                min: *BOAT_RANGE.start(),
                max: *BOAT_RANGE.end(),
            });
        }
        if !VISITOR_RANGE.contains(&visitors) {
            return Err(ConfigError::VisitorsOutOfRange {
                visitors,
                min: *VISITOR_RANGE.start(),
                max: *VISITOR_RANGE.end(),
            });
        }

        Ok(Self {
            boats,
            visitors,
            ..Self::default()
        })
    }

    /// Set the wall-clock length of one simulated minute.
    pub fn with_minute(mut self, minute: Duration) -> Self {
        self.minute = minute;
        self
    }

    /// Fix the seed used for visitor duration draws.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Set the claim retry delay. Rejects delays below [`MIN_CLAIM_BACKOFF`].
    pub fn with_claim_backoff(mut self, backoff: Duration) -> Result<Self, ConfigError> {
        if backoff < MIN_CLAIM_BACKOFF {
            return Err(ConfigError::BackoffTooShort {
                backoff,
                min: MIN_CLAIM_BACKOFF,
            });
        }
        self.claim_backoff = backoff;
        Ok(self)
    }

    pub fn boats(&self) -> usize {
        self.boats
    }

    pub fn visitors(&self) -> usize {
        self.visitors
    }

    pub fn minute(&self) -> Duration {
        self.minute
    }

    pub fn claim_backoff(&self) -> Duration {
        self.claim_backoff
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Wall-clock duration of `minutes` simulated minutes.
    pub fn scaled(&self, minutes: u32) -> Duration {
        self.minute * minutes
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            boats: *BOAT_RANGE.start(),
            visitors: *VISITOR_RANGE.start(),
            minute: Duration::from_millis(100),
            claim_backoff: Duration::from_millis(1),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_bounds() {
        assert!(SessionConfig::new(5, 20).is_ok());
        assert!(SessionConfig::new(10, 100).is_ok());
        assert!(SessionConfig::new(7, 55).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_boats() {
        assert_eq!(
            SessionConfig::new(4, 20),
            Err(ConfigError::BoatsOutOfRange {
                boats: 4,
                min: 5,
                max: 10
            })
        );
        assert!(matches!(
            SessionConfig::new(11, 20),
            Err(ConfigError::BoatsOutOfRange { boats: 11, .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_visitors() {
        assert!(matches!(
            SessionConfig::new(5, 19),
            Err(ConfigError::VisitorsOutOfRange { visitors: 19, .. })
        ));
        assert!(matches!(
            SessionConfig::new(5, 101),
            Err(ConfigError::VisitorsOutOfRange { visitors: 101, .. })
        ));
    }

    #[test]
    fn test_claim_backoff_floor() {
        let config = SessionConfig::default();
        assert!(config
            .clone()
            .with_claim_backoff(Duration::from_micros(50))
            .is_err());
        let config = config
            .with_claim_backoff(Duration::from_micros(500))
            .unwrap();
        assert_eq!(config.claim_backoff(), Duration::from_micros(500));
    }

    #[test]
    fn test_scaled_minutes() {
        let config = SessionConfig::default().with_minute(Duration::from_millis(2));
        assert_eq!(config.scaled(15), Duration::from_millis(30));
    }
}
