//! Execution core of the OSCAR scenario interpreter.
//!
//! A scenario is a [`Storyboard`](storyboard::Storyboard) made of nested storyboard elements
//! (stories, acts, maneuver groups, maneuvers, events and actions),
//! each one with its own lifecycle, started and stopped by [`Trigger`](trigger::Trigger)s
//! that combine [`Condition`](condition::Condition)s over the state of the simulated entities.
//!
//! The core knows nothing about the document format.
//! It talks to the outside world only through the [`simulator`] interfaces:
//! a read-only [`Snapshot`](simulator::Snapshot) of the entities at the current tick,
//! and a sink of [`EntityCommands`](simulator::EntityCommands) applying actions.
//!
//! ```
//! # use oscar_core::{scope::{Scope, Value}};
//! let mut scope = Scope::new();
//! scope.declare(Scope::GLOBAL, "speed", Value::Double(5.0)).expect("fresh name");
//! let act = scope.push(Scope::GLOBAL, Some("act"));
//! assert_eq!(scope.resolve(act, "$speed").expect("inherited"), &Value::Double(5.0));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod action;
pub mod condition;
pub mod entities;
#[cfg(test)]
mod fixtures;
pub mod interpreter;
pub mod math;
pub mod position;
mod rule;
pub mod scope;
pub mod simulator;
pub mod storyboard;
pub mod trigger;

pub use entities::{Entities, ObjectType, SemanticError};
pub use interpreter::{Diagnostic, Interpreter, Outcome, RunConfig, RuntimeError, Tracer};
pub use rule::Rule;

/// Simulated time, in seconds.
pub type Time = f64;

/// Tolerance used when comparing measured quantities for equality
/// (e.g. whether an actor has reached the target speed of a `SpeedAction`).
pub const EPSILON: f64 = 1e-3;

/// Distance under which an actor is considered to have acquired the position
/// requested by an `AcquirePositionAction`.
pub const ROUTING_TOLERANCE: f64 = 1.0;

/// Returns whether two quantities are equal up to [`EPSILON`].
///
/// Non-finite quantities are never equal to anything.
pub fn approx_eq(lhs: f64, rhs: f64) -> bool {
    lhs.is_finite() && rhs.is_finite() && (lhs - rhs).abs() <= EPSILON
}
