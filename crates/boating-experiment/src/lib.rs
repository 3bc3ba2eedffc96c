//! Boating Experiment: runs boat ride sessions and sweeps fleet/crowd sizes.
//!
//! This crate drives the `ride-kernel` session from the command line and
//! collects per-session reports:
//! - one narrated session with the reference pace (100 ms per minute)
//! - sweeps over boat and visitor counts with JSON results

pub mod results;
pub mod runner;
