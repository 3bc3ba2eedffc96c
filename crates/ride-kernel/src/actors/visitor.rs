//! VisitorActor: sightsee, queue, claim a boat, hand over, leave.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, trace};

use crate::config::{RIDE_MINUTES, TOUR_MINUTES};
use crate::error::Result;
use crate::events::SessionEvent;
use crate::registry::{BoatId, VisitorId};
use crate::session::SessionShared;

/// Control loop for one visitor.
///
/// States: Touring → Announcing → Searching → Paired → Departed. The ride
/// itself is simulated by the boat; the visitor is done once both parties
/// have crossed the boat's handoff barrier.
pub struct VisitorActor {
    id: VisitorId,
    rng: StdRng,
    shared: Arc<SessionShared>,
}

impl VisitorActor {
    /// Durations are drawn from a generator derived from the session seed and
    /// the visitor id, so a seeded session draws the same durations each run.
    pub(crate) fn new(id: VisitorId, session_seed: u64, shared: Arc<SessionShared>) -> Self {
        let seed = session_seed ^ (id.0 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self {
            id,
            rng: StdRng::seed_from_u64(seed),
            shared,
        }
    }

    /// A failure or panic closes the session, as for boats.
    pub async fn run(mut self) -> Result<()> {
        let guard = self.shared.closed.clone().drop_guard();
        let result = self.visit().await;
        match &result {
            Ok(()) => {
                guard.disarm();
            }
            Err(e) => error!(visitor = %self.id, error = %e, "Visitor actor failed"),
        }
        result
    }

    async fn visit(&mut self) -> Result<()> {
        let shared = self.shared.clone();

        // Touring
        let tour_minutes = self.rng.random_range(TOUR_MINUTES);
        let ride_minutes = self.rng.random_range(RIDE_MINUTES);
        shared.emit(SessionEvent::SightseeingStarted {
            visitor: self.id,
            minutes: tour_minutes,
        });
        tokio::time::sleep(shared.config.scaled(tour_minutes)).await;

        // Announcing
        shared.emit(SessionEvent::VisitorReady {
            visitor: self.id,
            ride_minutes,
        });
        shared.visitors_waiting.signal();

        // Searching
        shared.boats_waiting.wait().await;
        let boat = self.claim_boat(&shared, ride_minutes).await?;
        shared.emit(SessionEvent::BoatFound {
            visitor: self.id,
            boat,
        });

        // Paired: completes the boat's barrier and releases it into the ride.
        shared.handoff(boat)?.visitor_arrives(self.id).await;
        shared.emit(SessionEvent::VisitorLeft { visitor: self.id });
        Ok(())
    }

    /// Retry the registry claim until a boat is ours.
    ///
    /// A boat signals `boats_waiting` before it opens its slot, so a released
    /// visitor can briefly find nothing claimable. Several released visitors
    /// may also race for one open slot; losers back off and scan again.
    async fn claim_boat(&self, shared: &SessionShared, ride_minutes: u32) -> Result<BoatId> {
        loop {
            if let Some(boat) = shared.registry.claim(self.id, ride_minutes)? {
                return Ok(boat);
            }
            shared.ledger.claim_retried();
            trace!(visitor = %self.id, "No open boat, backing off");
            tokio::time::sleep(shared.config.claim_backoff()).await;
        }
    }
}
