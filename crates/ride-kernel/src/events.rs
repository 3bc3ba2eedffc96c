//! Progress events emitted by boat and visitor actors.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::info;

use crate::registry::{BoatId, VisitorId};

/// Something observable happened during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A boat actor started and will take passengers
    BoatReady { boat: BoatId },
    /// A boat took over a claimed ride
    RideStarted { boat: BoatId, visitor: VisitorId },
    /// A ride finished
    RideFinished {
        boat: BoatId,
        visitor: VisitorId,
        ride_minutes: u32,
    },
    /// A visitor went sightseeing before queueing for a boat
    SightseeingStarted { visitor: VisitorId, minutes: u32 },
    /// A visitor is queueing for a boat
    VisitorReady { visitor: VisitorId, ride_minutes: u32 },
    /// A visitor claimed a boat in the registry
    BoatFound { visitor: VisitorId, boat: BoatId },
    /// A visitor completed its handoff and left
    VisitorLeft { visitor: VisitorId },
}

/// Append-only destination for session events.
///
/// Called from actor tasks, never while a session lock is held.
pub trait ProgressSink: Send + Sync {
    fn record(&self, event: SessionEvent);
}

/// Writes each event as an `info` event with the ids and minutes as fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn record(&self, event: SessionEvent) {
        match event {
            SessionEvent::BoatReady { boat } => info!(boat = %boat, "Ready"),
            SessionEvent::RideStarted { boat, visitor } => {
                info!(boat = %boat, visitor = %visitor, "Start of ride")
            }
            SessionEvent::RideFinished {
                boat,
                visitor,
                ride_minutes,
            } => info!(boat = %boat, visitor = %visitor, ride_minutes, "End of ride"),
            SessionEvent::SightseeingStarted { visitor, minutes } => {
                info!(visitor = %visitor, minutes, "Starts sightseeing")
            }
            SessionEvent::VisitorReady {
                visitor,
                ride_minutes,
            } => info!(visitor = %visitor, ride_minutes, "Ready to ride a boat"),
            SessionEvent::BoatFound { visitor, boat } => {
                info!(visitor = %visitor, boat = %boat, "Finds boat")
            }
            SessionEvent::VisitorLeft { visitor } => info!(visitor = %visitor, "Leaving"),
        }
    }
}

/// Keeps every event in arrival order, optionally forwarding to another sink.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
    forward: Option<Box<dyn ProgressSink>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record events and also pass them on to `sink`.
    pub fn forwarding(sink: impl ProgressSink + 'static) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            forward: Some(Box::new(sink)),
        }
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&SessionEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| predicate(event))
            .count()
    }
}

impl std::fmt::Debug for RecordingSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSink")
            .field("events", &self.count(|_| true))
            .field("forwarding", &self.forward.is_some())
            .finish()
    }
}

impl ProgressSink for RecordingSink {
    fn record(&self, event: SessionEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        if let Some(forward) = &self.forward {
            forward.record(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.record(SessionEvent::BoatReady { boat: BoatId(1) });
        sink.record(SessionEvent::VisitorLeft {
            visitor: VisitorId(4),
        });

        assert_eq!(
            sink.events(),
            vec![
                SessionEvent::BoatReady { boat: BoatId(1) },
                SessionEvent::VisitorLeft {
                    visitor: VisitorId(4)
                },
            ]
        );
        assert_eq!(
            sink.count(|e| matches!(e, SessionEvent::VisitorLeft { .. })),
            1
        );
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tracing_sink_logs_ids_as_fields() {
        let log = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let log = log.clone();
                move || log.clone()
            })
            .with_ansi(false)
            .without_time()
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            TracingSink.record(SessionEvent::RideFinished {
                boat: BoatId(2),
                visitor: VisitorId(5),
                ride_minutes: 40,
            });
        });

        let line = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(line.contains("End of ride"), "{line}");
        assert!(line.contains("boat=Boat 2"), "{line}");
        assert!(line.contains("visitor=Visitor 5"), "{line}");
        assert!(line.contains("ride_minutes=40"), "{line}");
    }

    #[test]
    fn test_forwarding_sink_passes_events_on() {
        let sink = RecordingSink::forwarding(TracingSink);
        sink.record(SessionEvent::BoatFound {
            visitor: VisitorId(2),
            boat: BoatId(3),
        });
        assert_eq!(sink.events().len(), 1);
    }
}
