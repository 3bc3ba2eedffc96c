//! Boat and visitor actors.
//!
//! Each actor is one tokio task. They never talk to each other directly:
//!
//! ```text
//! Visitor                              Boat
//!   tour (sleep)                         signal boats_waiting ───┐
//!   signal visitors_waiting ──────────►  wait visitors_waiting   │
//!   wait boats_waiting  ◄────────────────────────────────────────┘
//!   claim registry slot (retry)          open registry slot
//!   handoff barrier ◄──────────────────► handoff barrier
//!   leave                                take assignment, ride (sleep)
//!                                        served += 1 → loop | completion gate
//! ```

mod boat;
mod visitor;

pub use boat::{BoatActor, BoatExit};
pub use visitor::VisitorActor;
