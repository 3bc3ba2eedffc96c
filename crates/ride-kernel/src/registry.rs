//! Boat registry: the shared record of which boat is free and who claimed it.
//!
//! One lock guards every slot. Visitors scan for the first claimable boat
//! under that lock, so two visitors can never record themselves against the
//! same boat, and a visitor can never be recorded against two boats.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// 1-based boat identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoatId(pub usize);

/// 1-based visitor identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(pub usize);

impl fmt::Display for BoatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Boat {}", self.0)
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Visitor {}", self.0)
    }
}

/// State of one boat slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoatRecord {
    /// True between the boat opening for a passenger and a visitor claiming it
    pub available: bool,
    /// Visitor that claimed this boat for the current ride
    pub assigned_visitor: Option<VisitorId>,
    /// Ride duration requested by the claiming visitor
    pub ride_minutes: u32,
}

impl BoatRecord {
    fn is_claimable(&self) -> bool {
        self.available && self.assigned_visitor.is_none()
    }
}

/// What a boat learns when it takes over a claimed ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub visitor: VisitorId,
    pub ride_minutes: u32,
}

#[derive(Debug)]
pub struct BoatRegistry {
    slots: Mutex<Vec<BoatRecord>>,
}

impl BoatRegistry {
    /// Create a registry with `boats` closed, unassigned slots.
    pub fn new(boats: usize) -> Self {
        Self {
            slots: Mutex::new(vec![BoatRecord::default(); boats]),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Boat ids in registry order.
    pub fn boat_ids(&self) -> impl Iterator<Item = BoatId> {
        (1..=self.len()).map(BoatId)
    }

    /// Claim the first open, unassigned boat for `visitor`.
    ///
    /// Returns `Ok(None)` when no boat is claimable right now; the caller is
    /// expected to back off and retry.
    pub fn claim(&self, visitor: VisitorId, ride_minutes: u32) -> Result<Option<BoatId>> {
        let mut slots = self.lock();

        if let Some(index) = slots
            .iter()
            .position(|slot| slot.assigned_visitor == Some(visitor))
        {
            return Err(SessionError::DuplicateClaim {
                visitor,
                boat: BoatId(index + 1),
            });
        }

        let Some(index) = slots.iter().position(BoatRecord::is_claimable) else {
            return Ok(None);
        };

        let slot = &mut slots[index];
        slot.assigned_visitor = Some(visitor);
        slot.ride_minutes = ride_minutes;
        Ok(Some(BoatId(index + 1)))
    }

    /// Open `boat` for its next passenger, dropping any trace of the previous one.
    pub fn open(&self, boat: BoatId) -> Result<()> {
        let mut slots = self.lock();
        let slot = slot_mut(&mut slots, boat)?;
        slot.assigned_visitor = None;
        slot.available = true;
        Ok(())
    }

    /// Read the claim recorded against `boat` and close it to further claims.
    pub fn take_assignment(&self, boat: BoatId) -> Result<Assignment> {
        let mut slots = self.lock();
        let slot = slot_mut(&mut slots, boat)?;
        slot.available = false;
        let visitor = slot
            .assigned_visitor
            .ok_or(SessionError::MissingAssignment { boat })?;
        Ok(Assignment {
            visitor,
            ride_minutes: slot.ride_minutes,
        })
    }

    /// Copy of every slot, in boat order.
    pub fn snapshot(&self) -> Vec<BoatRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BoatRecord>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn slot_mut(slots: &mut [BoatRecord], boat: BoatId) -> Result<&mut BoatRecord> {
    boat.0
        .checked_sub(1)
        .and_then(|index| slots.get_mut(index))
        .ok_or(SessionError::UnknownBoat { boat })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_claim_requires_open_boat() {
        let registry = BoatRegistry::new(3);
        assert_eq!(registry.claim(VisitorId(1), 20).unwrap(), None);

        registry.open(BoatId(2)).unwrap();
        assert_eq!(registry.claim(VisitorId(1), 20).unwrap(), Some(BoatId(2)));

        // Boat 2 is assigned now, nothing else is open.
        assert_eq!(registry.claim(VisitorId(2), 30).unwrap(), None);
    }

    #[test]
    fn test_claim_picks_first_open_slot() {
        let registry = BoatRegistry::new(5);
        registry.open(BoatId(4)).unwrap();
        registry.open(BoatId(2)).unwrap();
        assert_eq!(registry.claim(VisitorId(7), 15).unwrap(), Some(BoatId(2)));
        assert_eq!(registry.claim(VisitorId(8), 15).unwrap(), Some(BoatId(4)));
    }

    #[test]
    fn test_take_assignment_closes_slot() {
        let registry = BoatRegistry::new(2);
        registry.open(BoatId(1)).unwrap();
        registry.claim(VisitorId(3), 42).unwrap();

        let assignment = registry.take_assignment(BoatId(1)).unwrap();
        assert_eq!(
            assignment,
            Assignment {
                visitor: VisitorId(3),
                ride_minutes: 42
            }
        );

        let slot = registry.snapshot()[0];
        assert!(!slot.available);
        assert_eq!(slot.assigned_visitor, Some(VisitorId(3)));
    }

    #[test]
    fn test_take_assignment_without_claim_is_violation() {
        let registry = BoatRegistry::new(2);
        registry.open(BoatId(1)).unwrap();
        assert_eq!(
            registry.take_assignment(BoatId(1)),
            Err(SessionError::MissingAssignment { boat: BoatId(1) })
        );
    }

    #[test]
    fn test_reopen_clears_previous_visitor() {
        let registry = BoatRegistry::new(1);
        registry.open(BoatId(1)).unwrap();
        registry.claim(VisitorId(1), 20).unwrap();
        registry.take_assignment(BoatId(1)).unwrap();

        registry.open(BoatId(1)).unwrap();
        assert_eq!(registry.snapshot()[0].assigned_visitor, None);
        assert_eq!(registry.claim(VisitorId(2), 25).unwrap(), Some(BoatId(1)));
        assert_eq!(
            registry.take_assignment(BoatId(1)).unwrap().visitor,
            VisitorId(2)
        );
    }

    #[test]
    fn test_unknown_boat_rejected() {
        let registry = BoatRegistry::new(2);
        assert_eq!(
            registry.open(BoatId(0)),
            Err(SessionError::UnknownBoat { boat: BoatId(0) })
        );
        assert_eq!(
            registry.open(BoatId(3)),
            Err(SessionError::UnknownBoat { boat: BoatId(3) })
        );
    }

    #[test]
    fn test_duplicate_claim_rejected() {
        let registry = BoatRegistry::new(2);
        registry.open(BoatId(1)).unwrap();
        registry.open(BoatId(2)).unwrap();
        registry.claim(VisitorId(9), 20).unwrap();
        assert_eq!(
            registry.claim(VisitorId(9), 20),
            Err(SessionError::DuplicateClaim {
                visitor: VisitorId(9),
                boat: BoatId(1)
            })
        );
    }

    #[test]
    fn test_concurrent_claims_never_share_a_boat() {
        let registry = Arc::new(BoatRegistry::new(10));
        for boat in registry.boat_ids().collect::<Vec<_>>() {
            registry.open(boat).unwrap();
        }

        let handles: Vec<_> = (1..=40)
            .map(|id| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.claim(VisitorId(id), 15).unwrap())
            })
            .collect();

        let won: Vec<BoatId> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(won.len(), 10);
        assert_eq!(won.iter().collect::<HashSet<_>>().len(), 10);

        let assigned: HashSet<_> = registry
            .snapshot()
            .iter()
            .filter_map(|slot| slot.assigned_visitor)
            .collect();
        assert_eq!(assigned.len(), 10);
    }
}
