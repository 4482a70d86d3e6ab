//! Conditions over the state of the simulation.
//!
//! A [`Condition`] wraps one of the closed set of condition variants
//! with the persistent state needed to apply its delay and edge detection:
//!
//! 1. the variant is evaluated into a raw boolean;
//! 2. the raw boolean is delayed: it counts as true only after having been
//!    continuously true for at least the configured delay;
//! 3. the delayed boolean goes through edge detection against its value at the previous tick.
//!
//! Evaluation is idempotent within a tick: evaluating again at the same simulated time
//! returns the cached result without touching the persistent state.

mod entity;
mod value;

pub use entity::*;
pub use value::*;

use crate::Time;
use crate::storyboard::Context;
use log::trace;
use std::fmt;

// Tolerance on accumulated simulated time, which is a sum of float steps.
const TIME_TOLERANCE: Time = 1e-9;

/// When a condition fires, based on the value of the (delayed) boolean at the current
/// and at the previous tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionEdge {
    /// Fires when the boolean becomes true.
    #[default]
    Rising,
    /// Fires when the boolean becomes false.
    Falling,
    /// Fires when the boolean changes.
    RisingOrFalling,
    /// Fires whenever the boolean is true (continuous).
    None,
}

impl ConditionEdge {
    /// Parses the name of an edge as found in documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rising" => Some(ConditionEdge::Rising),
            "falling" => Some(ConditionEdge::Falling),
            "risingOrFalling" => Some(ConditionEdge::RisingOrFalling),
            "none" => Some(ConditionEdge::None),
            _ => None,
        }
    }

    fn fire(&self, previous: bool, current: bool) -> bool {
        match self {
            ConditionEdge::Rising => !previous && current,
            ConditionEdge::Falling => previous && !current,
            ConditionEdge::RisingOrFalling => previous != current,
            ConditionEdge::None => current,
        }
    }
}

/// The variants of conditions.
#[derive(Debug, Clone)]
pub enum ConditionKind {
    /// Conditions on the state of entities.
    Entity(ByEntityCondition),
    /// Conditions on other quantities.
    Value(ValueCondition),
}

impl ConditionKind {
    fn evaluate(&mut self, ctx: &Context) -> bool {
        match self {
            ConditionKind::Entity(condition) => condition.evaluate(ctx),
            ConditionKind::Value(condition) => condition.evaluate(ctx),
        }
    }

    fn reset(&mut self) {
        match self {
            ConditionKind::Entity(condition) => condition.reset(),
            ConditionKind::Value(_) => {}
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionKind::Entity(condition) => fmt::Display::fmt(condition, f),
            ConditionKind::Value(condition) => fmt::Display::fmt(condition, f),
        }
    }
}

/// A condition, with its delay and edge-detection state.
#[derive(Debug, Clone)]
pub struct Condition {
    name: String,
    delay: Time,
    edge: ConditionEdge,
    kind: ConditionKind,
    // Delayed value at the previous tick.
    previous: bool,
    // Time the raw value became (and stayed) true.
    true_since: Option<Time>,
    // Time and result of the last evaluation.
    last: Option<(Time, bool)>,
}

impl Condition {
    /// Creates a new condition, armed.
    pub fn new(name: &str, delay: Time, edge: ConditionEdge, kind: ConditionKind) -> Self {
        Self {
            name: name.to_owned(),
            delay: delay.max(0.0),
            edge,
            kind,
            previous: false,
            true_since: None,
            last: None,
        }
    }

    /// Name of the condition.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped variant.
    pub fn kind(&self) -> &ConditionKind {
        &self.kind
    }

    /// Result of the last evaluation (`false` if never evaluated).
    pub fn last_result(&self) -> bool {
        self.last.is_some_and(|(_, result)| result)
    }

    /// Evaluates the condition at the current tick.
    pub fn evaluate(&mut self, ctx: &Context) -> bool {
        let now = ctx.snapshot.time;
        if let Some((time, result)) = self.last {
            if time == now {
                return result;
            }
        }
        let raw = self.kind.evaluate(ctx);
        let delayed = if raw {
            let since = *self.true_since.get_or_insert(now);
            now - since + TIME_TOLERANCE >= self.delay
        } else {
            self.true_since = None;
            false
        };
        let result = self.edge.fire(self.previous, delayed);
        trace!(
            target: "storyboard",
            "condition '{}' at {now}: {} => raw {raw}, delayed {delayed}, fired {result}",
            self.name,
            self.kind
        );
        self.previous = delayed;
        self.last = Some((now, result));
        result
    }

    /// Re-arms the condition, forgetting its history.
    pub fn reset(&mut self) {
        self.previous = false;
        self.true_since = None;
        self.last = None;
        self.kind.reset();
    }

    /// Human-readable description of the condition and of its last measurements.
    pub fn description(&self) -> String {
        self.kind.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rule;
    use crate::fixtures;
    use crate::simulator::Snapshot;
    use crate::storyboard::Journal;
    use crate::trigger::{TriggeringEntities, TriggeringEntitiesRule};

    fn run(condition: &mut Condition, ticks: &[(Time, f64)]) -> Vec<bool> {
        let journal = Journal::default();
        ticks
            .iter()
            .map(|&(time, speed)| {
                let snapshot = Snapshot::new(time).with(fixtures::car("ego", 0.0, speed));
                let ctx = Context {
                    snapshot: &snapshot,
                    journal: &journal,
                };
                condition.evaluate(&ctx)
            })
            .collect()
    }

    // Holds exactly at the ticks flagged as true.
    fn moving(edge: ConditionEdge, delay: Time, truth: &[(Time, bool)]) -> Vec<bool> {
        let entities = fixtures::entities();
        let triggering_entities =
            TriggeringEntities::new(TriggeringEntitiesRule::Any, vec!["ego".into()], &entities)
                .expect("triggering entities");
        let mut condition = Condition::new(
            "moving",
            delay,
            edge,
            ConditionKind::Entity(ByEntityCondition::new(
                triggering_entities,
                EntityCondition::Speed(SpeedCondition::new(1.0, Rule::GreaterThan)),
            )),
        );
        let ticks = truth
            .iter()
            .map(|&(time, holds)| (time, if holds { 2.0 } else { 0.0 }))
            .collect::<Vec<_>>();
        run(&mut condition, &ticks)
    }

    #[test]
    fn edges() {
        let truth = [
            (0.0, false),
            (0.1, true),
            (0.2, true),
            (0.3, false),
            (0.4, true),
        ];
        assert_eq!(
            moving(ConditionEdge::Rising, 0.0, &truth),
            vec![false, true, false, false, true]
        );
        assert_eq!(
            moving(ConditionEdge::Falling, 0.0, &truth),
            vec![false, false, false, true, false]
        );
        assert_eq!(
            moving(ConditionEdge::RisingOrFalling, 0.0, &truth),
            vec![false, true, false, true, true]
        );
        assert_eq!(
            moving(ConditionEdge::None, 0.0, &truth),
            vec![false, true, true, false, true]
        );
    }

    #[test]
    fn rising_at_first_tick() {
        assert_eq!(
            moving(ConditionEdge::Rising, 0.0, &[(0.0, true), (0.1, true)]),
            vec![true, false]
        );
    }

    #[test]
    fn delay() {
        // True for 0.2s only: never reaches the 0.3s delay.
        let short = [
            (0.0, true),
            (0.1, true),
            (0.2, true),
            (0.3, false),
            (0.4, true),
            (0.5, true),
        ];
        assert_eq!(moving(ConditionEdge::None, 0.3, &short), vec![false; 6]);
        // Continuous truth reaching exactly the delay fires on that tick.
        let long = [(0.0, true), (0.1, true), (0.2, true), (0.3, true), (0.4, true)];
        assert_eq!(
            moving(ConditionEdge::Rising, 0.3, &long),
            vec![false, false, false, true, false]
        );
    }

    fn after_one_second() -> Condition {
        Condition::new(
            "time",
            0.0,
            ConditionEdge::Rising,
            ConditionKind::Value(ValueCondition::SimulationTime {
                value: 1.0,
                rule: Rule::GreaterOrEqual,
            }),
        )
    }

    #[test]
    fn idempotent_within_tick() {
        let mut condition = after_one_second();
        let fired = run(&mut condition, &[(0.5, 0.0), (1.0, 0.0), (1.0, 0.0), (1.5, 0.0)]);
        assert_eq!(fired, vec![false, true, true, false]);
    }

    #[test]
    fn reset_rearms() {
        let mut condition = after_one_second();
        assert_eq!(run(&mut condition, &[(1.0, 0.0), (2.0, 0.0)]), vec![true, false]);
        condition.reset();
        assert_eq!(run(&mut condition, &[(3.0, 0.0)]), vec![true]);
    }
}
