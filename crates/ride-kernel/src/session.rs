//! Session orchestration: shared state, actor launch, completion, teardown.
//!
//! ```text
//! Session::run
//!   ├─ spawn BoatActor × m ──┐
//!   ├─ spawn VisitorActor × n┤  boats_waiting / visitors_waiting (rendezvous)
//!   │                        │  BoatRegistry (claim / open / take_assignment)
//!   │                        │  handoff barrier per boat
//!   ├─ completion gate  ◄────┘  crossed by the boat that serves visitor n
//!   ├─ cancel `closed`          parked boats leave their rendezvous wait
//!   └─ join every actor → SessionOutcome
//! ```

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Barrier;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::actors::{BoatActor, BoatExit, VisitorActor};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::events::{ProgressSink, SessionEvent, TracingSink};
use crate::handoff::Handoff;
use crate::registry::{BoatId, BoatRegistry, VisitorId};
use crate::rendezvous::RendezvousCounter;

/// One completed ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideRecord {
    pub boat: BoatId,
    pub visitor: VisitorId,
    pub ride_minutes: u32,
}

/// Result of a session that ran to completion.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    /// Seed the visitor draws were derived from
    pub seed: u64,
    /// Visitors served; equals the configured visitor count
    pub visitors_served: usize,
    /// Boat that crossed the completion gate
    pub closed_by: BoatId,
    /// Rides in completion order
    pub rides: Vec<RideRecord>,
    /// Highest number of rides in progress at the same time
    pub peak_concurrent_rides: usize,
    /// Claim attempts that found no open boat
    pub claim_retries: u64,
    /// Wall-clock time from launch to the last join
    pub elapsed: Duration,
}

impl SessionOutcome {
    /// Rides completed per boat, indexed by `boat - 1`.
    pub fn rides_per_boat(&self, boats: usize) -> Vec<usize> {
        let mut counts = vec![0; boats];
        for ride in &self.rides {
            if let Some(count) = ride.boat.0.checked_sub(1).and_then(|i| counts.get_mut(i)) {
                *count += 1;
            }
        }
        counts
    }
}

/// Ride bookkeeping shared by boat actors.
#[derive(Debug, Default)]
pub(crate) struct RideLedger {
    served: Mutex<usize>,
    rides: Mutex<Vec<RideRecord>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    claim_retries: AtomicU64,
}

impl RideLedger {
    pub(crate) fn ride_started(&self) {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
    }

    /// Record a finished ride and return the post-increment served count.
    pub(crate) fn ride_finished(&self, ride: RideRecord) -> usize {
        self.active.fetch_sub(1, Ordering::SeqCst);
        lock(&self.rides).push(ride);
        let mut served = lock(&self.served);
        *served += 1;
        *served
    }

    pub(crate) fn claim_retried(&self) {
        self.claim_retries.fetch_add(1, Ordering::Relaxed);
    }
}

/// State every actor of one session shares.
pub(crate) struct SessionShared {
    pub config: SessionConfig,
    pub registry: BoatRegistry,
    /// Signalled by boats, waited on by visitors
    pub boats_waiting: RendezvousCounter,
    /// Signalled by visitors, waited on by boats
    pub visitors_waiting: RendezvousCounter,
    handoffs: Vec<Handoff>,
    pub completion: Barrier,
    /// Fired once the session is over, or as soon as an actor fails
    pub closed: CancellationToken,
    pub ledger: RideLedger,
    sink: Arc<dyn ProgressSink>,
}

impl SessionShared {
    pub(crate) fn new(config: SessionConfig, sink: Arc<dyn ProgressSink>) -> Self {
        let boats = config.boats();
        Self {
            registry: BoatRegistry::new(boats),
            boats_waiting: RendezvousCounter::new("boats_waiting"),
            visitors_waiting: RendezvousCounter::new("visitors_waiting"),
            handoffs: (0..boats).map(|_| Handoff::new()).collect(),
            completion: Barrier::new(2),
            closed: CancellationToken::new(),
            ledger: RideLedger::default(),
            config,
            sink,
        }
    }

    /// Handoff pairing `boat` with the visitor that claimed it.
    pub fn handoff(&self, boat: BoatId) -> Result<&Handoff> {
        boat.0
            .checked_sub(1)
            .and_then(|index| self.handoffs.get(index))
            .ok_or(SessionError::UnknownBoat { boat })
    }

    pub fn emit(&self, event: SessionEvent) {
        self.sink.record(event);
    }
}

/// A configured session, ready to run once.
pub struct Session {
    config: SessionConfig,
    sink: Arc<dyn ProgressSink>,
}

impl Session {
    /// Create a session that reports progress through `tracing`.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the progress sink.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run every boat and visitor to completion.
    ///
    /// Returns once the completion gate has released, the session has been
    /// closed, and every actor has been joined. An invariant violation in any
    /// actor aborts the session and is returned as the error.
    pub async fn run(self) -> Result<SessionOutcome> {
        let started = Instant::now();
        let seed = self.config.seed().unwrap_or_else(rand::random);
        let boats = self.config.boats();
        let visitors = self.config.visitors();
        let shared = Arc::new(SessionShared::new(self.config, self.sink));

        info!(boats, visitors, seed, "Starting ride session");

        let boat_tasks: Vec<JoinHandle<Result<BoatExit>>> = (1..=boats)
            .map(|id| tokio::spawn(BoatActor::new(BoatId(id), shared.clone()).run()))
            .collect();

        let visitor_tasks: Vec<JoinHandle<Result<()>>> = (1..=visitors)
            .map(|id| {
                let actor = VisitorActor::new(VisitorId(id), seed, shared.clone());
                tokio::spawn(actor.run())
            })
            .collect();

        // The closing boat meets us here. `closed` only fires early when an
        // actor has failed.
        let completed = tokio::select! {
            _ = shared.completion.wait() => true,
            _ = shared.closed.cancelled() => false,
        };

        shared.closed.cancel();

        if !completed {
            error!("Session aborted before the completion gate");
            for task in &visitor_tasks {
                task.abort();
            }
            for task in &boat_tasks {
                task.abort();
            }
        }

        let boat_results = join_all(boat_tasks).await;
        let visitor_results = join_all(visitor_tasks).await;

        let mut first_error = None;
        let mut aborted = 0;
        let mut closed_by = Vec::new();

        for (index, joined) in boat_results.into_iter().enumerate() {
            let boat = BoatId(index + 1);
            match flatten(joined, &boat.to_string()) {
                Ok(Some(BoatExit::ClosedSession)) => closed_by.push(boat),
                Ok(Some(BoatExit::Cancelled)) => debug!(boat = %boat, "Boat stood down"),
                Ok(None) => aborted += 1,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        for (index, joined) in visitor_results.into_iter().enumerate() {
            let visitor = VisitorId(index + 1);
            match flatten(joined, &visitor.to_string()) {
                Ok(Some(())) => {}
                Ok(None) => aborted += 1,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if !completed {
            return Err(SessionError::ActorFailed {
                actor: "session".to_string(),
                reason: format!("closed before completion, {aborted} actors aborted"),
            });
        }

        let &[closed_by] = closed_by.as_slice() else {
            return Err(SessionError::CompletionGate {
                count: closed_by.len(),
            });
        };

        let ledger = &shared.ledger;
        let visitors_served = *lock(&ledger.served);
        let outcome = SessionOutcome {
            seed,
            visitors_served,
            closed_by,
            rides: lock(&ledger.rides).clone(),
            peak_concurrent_rides: ledger.peak.load(Ordering::SeqCst),
            claim_retries: ledger.claim_retries.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        };

        info!(
            visitors_served = outcome.visitors_served,
            closed_by = %outcome.closed_by,
            peak_concurrent_rides = outcome.peak_concurrent_rides,
            claim_retries = outcome.claim_retries,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Ride session complete"
        );

        Ok(outcome)
    }
}

/// Unwrap a joined actor task. `Ok(None)` means the task was aborted.
fn flatten<T>(
    joined: std::result::Result<Result<T>, JoinError>,
    actor: &str,
) -> Result<Option<T>> {
    match joined {
        Ok(result) => result.map(Some),
        Err(e) if e.is_cancelled() => Ok(None),
        Err(e) => Err(SessionError::ActorFailed {
            actor: actor.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
