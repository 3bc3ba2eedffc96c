//! Ride Kernel: matching a fixed fleet of boats with a stream of visitors.
//!
//! This crate implements the synchronization protocol behind a boat ride
//! session: visitors announce themselves through counting rendezvous
//! primitives, race to claim a free boat in a shared registry, and hand the
//! ride over to the boat through a per-boat two-party barrier. The session
//! ends when the last ride completes and the closing boat releases the
//! orchestrator through the completion gate.

pub mod actors;
pub mod config;
pub mod error;
pub mod events;
pub mod handoff;
pub mod registry;
pub mod rendezvous;
pub mod session;

pub use config::{ConfigError, SessionConfig};
pub use error::SessionError;
pub use events::{ProgressSink, RecordingSink, SessionEvent, TracingSink};
pub use handoff::Handoff;
pub use registry::{Assignment, BoatId, BoatRecord, BoatRegistry, VisitorId};
pub use rendezvous::RendezvousCounter;
pub use session::{RideRecord, Session, SessionOutcome};
