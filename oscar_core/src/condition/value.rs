use crate::Rule;
use crate::storyboard::{Context, StoryboardElementState, StoryboardElementType, Transition};
use std::fmt;

/// A state or transition of a storyboard element, as queried by
/// [`ValueCondition::StoryboardElementState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementStateQuery {
    /// The element started during the previous tick.
    StartTransition,
    /// The element ended regularly during the previous tick.
    EndTransition,
    /// The element was stopped during the previous tick.
    StopTransition,
    /// The element skipped an execution during the previous tick.
    SkipTransition,
    /// The element is waiting for its start trigger.
    StandbyState,
    /// The element is executing.
    RunningState,
    /// The element is done.
    CompleteState,
}

impl ElementStateQuery {
    /// Parses the name of a state or transition as found in documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "startTransition" => Some(ElementStateQuery::StartTransition),
            "endTransition" => Some(ElementStateQuery::EndTransition),
            "stopTransition" => Some(ElementStateQuery::StopTransition),
            "skipTransition" => Some(ElementStateQuery::SkipTransition),
            "standbyState" => Some(ElementStateQuery::StandbyState),
            "runningState" => Some(ElementStateQuery::RunningState),
            "completeState" => Some(ElementStateQuery::CompleteState),
            _ => None,
        }
    }
}

impl fmt::Display for ElementStateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ElementStateQuery::StartTransition => "startTransition",
            ElementStateQuery::EndTransition => "endTransition",
            ElementStateQuery::StopTransition => "stopTransition",
            ElementStateQuery::SkipTransition => "skipTransition",
            ElementStateQuery::StandbyState => "standbyState",
            ElementStateQuery::RunningState => "runningState",
            ElementStateQuery::CompleteState => "completeState",
        })
    }
}

/// Conditions that do not depend on entities.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueCondition {
    /// Compares the simulation time against a value.
    SimulationTime {
        /// Threshold, in seconds.
        value: f64,
        /// Comparison rule.
        rule: Rule,
    },
    /// Holds when a storyboard element is in a state (or went through a transition).
    StoryboardElementState {
        /// Type of the referenced element.
        element_type: StoryboardElementType,
        /// Name of the referenced element.
        element_ref: String,
        /// Queried state or transition.
        state: ElementStateQuery,
    },
}

impl ValueCondition {
    pub(super) fn evaluate(&mut self, ctx: &Context) -> bool {
        match self {
            ValueCondition::SimulationTime { value, rule } => {
                rule.apply(ctx.snapshot.time, *value)
            }
            ValueCondition::StoryboardElementState {
                element_type,
                element_ref,
                state,
            } => {
                let journal = ctx.journal;
                let in_state = |expected: StoryboardElementState| {
                    journal.state(*element_type, element_ref) == Some(expected)
                };
                let transitioned = |transition: Transition| {
                    journal.transitioned(*element_type, element_ref, transition)
                };
                match state {
                    ElementStateQuery::StartTransition => transitioned(Transition::Start),
                    ElementStateQuery::EndTransition => transitioned(Transition::End),
                    ElementStateQuery::StopTransition => transitioned(Transition::Stop),
                    ElementStateQuery::SkipTransition => transitioned(Transition::Skip),
                    ElementStateQuery::StandbyState => in_state(StoryboardElementState::Standby),
                    ElementStateQuery::RunningState => in_state(StoryboardElementState::Running),
                    ElementStateQuery::CompleteState => in_state(StoryboardElementState::Complete),
                }
            }
        }
    }
}

impl fmt::Display for ValueCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueCondition::SimulationTime { value, rule } => {
                write!(f, "simulation time {rule} {value}?")
            }
            ValueCondition::StoryboardElementState {
                element_type,
                element_ref,
                state,
            } => write!(f, "{element_type} '{element_ref}' {state}?"),
        }
    }
}
