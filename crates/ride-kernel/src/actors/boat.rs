//! BoatActor: advertise, wait for a passenger, ride, repeat.

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{Result, SessionError};
use crate::events::SessionEvent;
use crate::registry::BoatId;
use crate::session::{RideRecord, SessionShared};

/// How a boat actor left the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoatExit {
    /// Served the last visitor and released the orchestrator
    ClosedSession,
    /// Was parked waiting for a visitor when the session closed
    Cancelled,
}

/// Control loop for one boat.
///
/// States: Idle → Advertising → Paired → Riding → (Advertising | Terminated).
/// The boat is reused for every visitor it carries; its registry slot and
/// handoff barrier live for the whole session.
pub struct BoatActor {
    id: BoatId,
    shared: Arc<SessionShared>,
}

impl BoatActor {
    pub(crate) fn new(id: BoatId, shared: Arc<SessionShared>) -> Self {
        Self { id, shared }
    }

    /// Run until this boat closes the session or the session closes under it.
    ///
    /// A failure or panic closes the session so the orchestrator stops
    /// waiting on the completion gate.
    pub async fn run(self) -> Result<BoatExit> {
        // Cancels `closed` on drop unless disarmed by a clean exit.
        let guard = self.shared.closed.clone().drop_guard();
        let result = self.serve().await;
        match &result {
            Ok(_) => {
                guard.disarm();
            }
            Err(e) => error!(boat = %self.id, error = %e, "Boat actor failed"),
        }
        result
    }

    async fn serve(&self) -> Result<BoatExit> {
        let shared = &self.shared;
        let visitors = shared.config.visitors();

        shared.emit(SessionEvent::BoatReady { boat: self.id });

        loop {
            // Advertising
            shared.boats_waiting.signal();
            if !shared
                .visitors_waiting
                .wait_or_cancelled(&shared.closed)
                .await
            {
                debug!(boat = %self.id, "Session closed while waiting for a visitor");
                return Ok(BoatExit::Cancelled);
            }
            shared.registry.open(self.id)?;

            // Paired: released only once the claiming visitor arrives too.
            let partner = shared.handoff(self.id)?.boat_arrives().await;
            let assignment = shared.registry.take_assignment(self.id)?;
            if partner != Some(assignment.visitor) {
                return Err(SessionError::HandoffMismatch {
                    boat: self.id,
                    assigned: assignment.visitor,
                    partner,
                });
            }

            // Riding
            shared.emit(SessionEvent::RideStarted {
                boat: self.id,
                visitor: assignment.visitor,
            });
            shared.ledger.ride_started();
            tokio::time::sleep(shared.config.scaled(assignment.ride_minutes)).await;
            shared.emit(SessionEvent::RideFinished {
                boat: self.id,
                visitor: assignment.visitor,
                ride_minutes: assignment.ride_minutes,
            });

            let served = shared.ledger.ride_finished(RideRecord {
                boat: self.id,
                visitor: assignment.visitor,
                ride_minutes: assignment.ride_minutes,
            });

            if served > visitors {
                return Err(SessionError::ServedOverflow { served, visitors });
            }
            if served == visitors {
                debug!(boat = %self.id, served, "Last visitor served, releasing orchestrator");
                shared.completion.wait().await;
                return Ok(BoatExit::ClosedSession);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::SessionConfig;
    use crate::events::RecordingSink;
    use crate::registry::VisitorId;

    fn shared() -> Arc<SessionShared> {
        let config = SessionConfig::default().with_minute(Duration::from_millis(1));
        Arc::new(SessionShared::new(config, Arc::new(RecordingSink::new())))
    }

    /// Wake the boat, wait for its slot to open, and return once it is open.
    async fn wake_and_wait_open(shared: &SessionShared, boat: BoatId) {
        shared.visitors_waiting.signal();
        while !shared.registry.snapshot()[boat.0 - 1].available {
            tokio::time::sleep(Duration::from_micros(100)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_boat_rejects_handoff_from_another_visitor() {
        let shared = shared();
        let boat = BoatId(1);
        let task = tokio::spawn(BoatActor::new(boat, shared.clone()).run());

        wake_and_wait_open(&shared, boat).await;
        assert_eq!(shared.registry.claim(VisitorId(3), 20).unwrap(), Some(boat));
        shared.handoff(boat).unwrap().visitor_arrives(VisitorId(4)).await;

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(
            err,
            SessionError::HandoffMismatch {
                boat,
                assigned: VisitorId(3),
                partner: Some(VisitorId(4)),
            }
        );
        assert!(shared.closed.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_boat_without_assignment_closes_session() {
        let shared = shared();
        let boat = BoatId(2);
        let task = tokio::spawn(BoatActor::new(boat, shared.clone()).run());

        wake_and_wait_open(&shared, boat).await;
        shared.handoff(boat).unwrap().visitor_arrives(VisitorId(1)).await;

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err, SessionError::MissingAssignment { boat });
        assert!(shared.closed.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parked_boat_stands_down_on_close() {
        let shared = shared();
        let task = tokio::spawn(BoatActor::new(BoatId(1), shared.clone()).run());

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(shared.boats_waiting.value(), 1);
        shared.closed.cancel();

        assert_eq!(task.await.unwrap(), Ok(BoatExit::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_boat_closes_session() {
        let shared = shared();
        let task = tokio::spawn(BoatActor::new(BoatId(1), shared.clone()).run());
        tokio::time::sleep(Duration::from_millis(5)).await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(shared.closed.is_cancelled());
    }
}
