//! Per-boat handoff: a two-party barrier that also carries who arrived.
//!
//! The visitor records itself before crossing, the boat reads the record
//! after crossing. The barrier orders the write before the read, and the
//! next visitor cannot claim the boat until the boat reopens its slot, so
//! the boat always reads the partner of the current ride.

use std::sync::{Mutex, PoisonError};

use tokio::sync::Barrier;

use crate::registry::VisitorId;

#[derive(Debug)]
pub struct Handoff {
    barrier: Barrier,
    partner: Mutex<Option<VisitorId>>,
}

impl Default for Handoff {
    fn default() -> Self {
        Self::new()
    }
}

impl Handoff {
    pub fn new() -> Self {
        Self {
            barrier: Barrier::new(2),
            partner: Mutex::new(None),
        }
    }

    /// Visitor side: record `visitor` as the partner, then wait for the boat.
    pub async fn visitor_arrives(&self, visitor: VisitorId) {
        *self.partner.lock().unwrap_or_else(PoisonError::into_inner) = Some(visitor);
        self.barrier.wait().await;
    }

    /// Boat side: wait for the visitor, then take the partner it recorded.
    pub async fn boat_arrives(&self) -> Option<VisitorId> {
        self.barrier.wait().await;
        self.partner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_boat_sees_the_visitor_that_crossed() {
        let handoff = Arc::new(Handoff::new());
        let boat = tokio::spawn({
            let handoff = handoff.clone();
            async move { handoff.boat_arrives().await }
        });

        handoff.visitor_arrives(VisitorId(9)).await;
        assert_eq!(boat.await.unwrap(), Some(VisitorId(9)));
    }

    #[tokio::test]
    async fn test_partner_is_cleared_for_the_next_ride() {
        let handoff = Arc::new(Handoff::new());
        for visitor in [VisitorId(1), VisitorId(2)] {
            let boat = tokio::spawn({
                let handoff = handoff.clone();
                async move { handoff.boat_arrives().await }
            });
            handoff.visitor_arrives(visitor).await;
            assert_eq!(boat.await.unwrap(), Some(visitor));
        }
        assert_eq!(*handoff.partner.lock().unwrap(), None);
    }
}
