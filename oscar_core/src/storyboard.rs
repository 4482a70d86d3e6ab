//! The storyboard state machine.
//!
//! Every element of the hierarchy
//! (story, act, maneuver group, maneuver, event, action)
//! is wrapped in a [`StoryboardElement`] driving its lifecycle:
//!
//! ```text
//! standby → starting → running → stopping → complete
//! ```
//!
//! Elements in standby wait for their start trigger.
//! Starting and stopping are transient: an element goes through them within a single tick.
//! A running element runs its children (or its action) and completes when they all have.
//! When the stop trigger of a running element fires,
//! the element and all of its descendants are forced to complete (override),
//! without consulting whether their actions have been accomplished.

mod element;
mod event;
mod journal;
mod story;

pub use element::{StoryboardBehavior, StoryboardElement};
pub use event::{Event, Maneuver, Priority};
pub use journal::{Journal, Transition};
pub use story::{Act, ManeuverGroup, Story};

use crate::action::Action;
use crate::entities::ScenarioObject;
use crate::interpreter::{Diagnostic, Outcome};
use crate::simulator::{CommandError, EntityCommands, Snapshot};
use crate::trigger::Trigger;
use log::{info, warn};
use serde::Serialize;
use std::fmt;

/// Read-only view of the world during a tick.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// Entities at the current tick.
    pub snapshot: &'a Snapshot,
    /// States and transitions of the storyboard elements as of the end of the previous tick.
    pub journal: &'a Journal,
}

/// Sink of the side effects of a tick.
pub struct Effects<'a> {
    commands: &'a mut dyn EntityCommands,
    pub(crate) journal: &'a mut Journal,
    outcome: &'a mut Outcome,
    errors: Vec<CommandError>,
}

impl<'a> Effects<'a> {
    /// Collects side effects into the given command sink, journal and outcome.
    pub fn new(
        commands: &'a mut dyn EntityCommands,
        journal: &'a mut Journal,
        outcome: &'a mut Outcome,
    ) -> Self {
        Self {
            commands,
            journal,
            outcome,
            errors: Vec::new(),
        }
    }

    /// Sends a command to the simulator.
    ///
    /// Commands addressing entities that do not exist are dropped with a warning;
    /// other failures are collected and reported at the end of the tick.
    pub fn issue<F>(&mut self, command: F)
    where
        F: FnOnce(&mut dyn EntityCommands) -> Result<(), CommandError>,
    {
        match command(&mut *self.commands) {
            Ok(()) => {}
            Err(CommandError::EntityNotPresent(entity)) => {
                warn!(target: "storyboard", "command to non-existing entity '{entity}' ignored");
            }
            Err(err) => {
                warn!(target: "storyboard", "command failed: {err}");
                self.errors.push(err);
            }
        }
    }

    /// Latches the outcome of the scenario, unless already decided.
    pub fn latch(&mut self, outcome: Outcome) {
        self.outcome.latch(outcome);
    }

    /// The outcome of the scenario so far.
    pub fn outcome(&self) -> &Outcome {
        self.outcome
    }

    /// The command failures collected so far.
    pub fn into_errors(self) -> Vec<CommandError> {
        self.errors
    }
}

/// Lifecycle state of a storyboard element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StoryboardElementState {
    /// Waiting for the start trigger.
    Standby,
    /// Doing its one-time start work.
    Starting,
    /// Executing.
    Running,
    /// Tearing down.
    Stopping,
    /// Done.
    Complete,
}

impl fmt::Display for StoryboardElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoryboardElementState::Standby => "standby",
            StoryboardElementState::Starting => "starting",
            StoryboardElementState::Running => "running",
            StoryboardElementState::Stopping => "stopping",
            StoryboardElementState::Complete => "complete",
        })
    }
}

/// The types of storyboard elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StoryboardElementType {
    /// `Story`
    Story,
    /// `Act`
    Act,
    /// `ManeuverGroup`
    ManeuverGroup,
    /// `Maneuver`
    Maneuver,
    /// `Event`
    Event,
    /// `Action`
    Action,
}

impl StoryboardElementType {
    /// Parses the name of an element type as found in documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "story" => Some(StoryboardElementType::Story),
            "act" => Some(StoryboardElementType::Act),
            "maneuverGroup" => Some(StoryboardElementType::ManeuverGroup),
            "maneuver" => Some(StoryboardElementType::Maneuver),
            "event" => Some(StoryboardElementType::Event),
            "action" => Some(StoryboardElementType::Action),
            _ => None,
        }
    }
}

impl fmt::Display for StoryboardElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoryboardElementType::Story => "story",
            StoryboardElementType::Act => "act",
            StoryboardElementType::ManeuverGroup => "maneuver group",
            StoryboardElementType::Maneuver => "maneuver",
            StoryboardElementType::Event => "event",
            StoryboardElementType::Action => "action",
        })
    }
}

/// Snapshot of the state of a storyboard element and of its descendants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementStatus {
    /// Name of the element.
    pub name: String,
    /// Type of the element.
    #[serde(rename = "type")]
    pub element_type: StoryboardElementType,
    /// Current state.
    pub state: StoryboardElementState,
    /// Completed executions.
    pub execution_count: usize,
    /// Children of the element.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementStatus>,
}

/// Set-up of the scenario before the stories start.
#[derive(Debug, Clone, Default)]
pub struct Init {
    spawn: Vec<ScenarioObject>,
    actions: Vec<StoryboardElement<Action>>,
}

impl Init {
    /// Objects spawned at the first tick, and actions performed right after.
    pub fn new(spawn: Vec<ScenarioObject>, actions: Vec<StoryboardElement<Action>>) -> Self {
        Self { spawn, actions }
    }

    /// Objects spawned at the first tick.
    pub fn spawned(&self) -> &[ScenarioObject] {
        &self.spawn
    }

    /// Init actions.
    pub fn actions(&self) -> &[StoryboardElement<Action>] {
        &self.actions
    }

    fn is_complete(&self) -> bool {
        self.actions.iter().all(StoryboardElement::is_complete)
    }
}

/// The root of the storyboard: init, stories and stop trigger, plus the scenario outcome.
#[derive(Debug, Clone)]
pub struct Storyboard {
    init: Init,
    stories: Vec<StoryboardElement<Story>>,
    stop_trigger: Trigger,
    journal: Journal,
    outcome: Outcome,
    ticks: usize,
}

impl Storyboard {
    /// Assembles a storyboard.
    pub fn new(init: Init, stories: Vec<StoryboardElement<Story>>, stop_trigger: Trigger) -> Self {
        let mut journal = Journal::default();
        for status in init
            .actions
            .iter()
            .map(StoryboardElement::status)
            .chain(stories.iter().map(StoryboardElement::status))
        {
            journal.register(&status);
        }
        Self {
            init,
            stories,
            stop_trigger,
            journal,
            outcome: Outcome::Running,
            ticks: 0,
        }
    }

    /// The init section.
    pub fn init(&self) -> &Init {
        &self.init
    }

    /// The stories.
    pub fn stories(&self) -> &[StoryboardElement<Story>] {
        &self.stories
    }

    /// The outcome of the scenario so far.
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// The states of the elements at the end of the last tick.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Latches the outcome of the scenario, unless already decided.
    pub fn latch(&mut self, outcome: Outcome) {
        self.outcome.latch(outcome);
    }

    /// Processes one tick against a snapshot of the entities,
    /// sending the resulting commands to `commands`.
    ///
    /// Returns the commands that failed.
    /// The tick is processed entirely even when some command fails.
    pub fn tick(
        &mut self,
        snapshot: &Snapshot,
        commands: &mut dyn EntityCommands,
    ) -> Vec<CommandError> {
        if self.outcome.is_decided() {
            return Vec::new();
        }
        let journal = self.journal.clone();
        self.journal.clear_transitions();
        let ctx = Context {
            snapshot,
            journal: &journal,
        };
        let mut fx = Effects::new(commands, &mut self.journal, &mut self.outcome);
        if self.ticks == 0 {
            info!(target: "storyboard", "init: spawning {} objects", self.init.spawn.len());
            for object in &self.init.spawn {
                fx.issue(|commands| commands.spawn(object, None));
            }
        }
        self.ticks += 1;
        // Init actions that have not completed (e.g. continuous ones) keep running
        // alongside the stories.
        for action in self.init.actions.iter_mut() {
            action.tick(&ctx, &mut fx);
        }
        if self.stop_trigger.evaluate(&ctx) {
            info!(target: "storyboard", "storyboard stop trigger fired at {}", snapshot.time);
            for action in self.init.actions.iter_mut() {
                action.stop(&ctx, &mut fx);
            }
            for story in self.stories.iter_mut() {
                story.stop(&ctx, &mut fx);
            }
            fx.latch(Outcome::Success);
        } else {
            for story in self.stories.iter_mut() {
                story.tick(&ctx, &mut fx);
            }
            if !self.stories.is_empty() && self.stories.iter().all(StoryboardElement::is_complete)
            {
                info!(target: "storyboard", "all stories complete at {}", snapshot.time);
                fx.latch(Outcome::Success);
            }
        }
        fx.into_errors()
    }

    /// Diagnostics of every active condition and action.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if !self.init.is_complete() {
            for action in &self.init.actions {
                action.diagnostics("init", &mut diagnostics);
            }
        }
        diagnostics.extend(self.stop_trigger.conditions().map(|condition| Diagnostic {
            path: condition.name().to_owned(),
            state: StoryboardElementState::Running,
            description: condition.description(),
        }));
        for story in &self.stories {
            story.diagnostics("", &mut diagnostics);
        }
        diagnostics
    }

    /// The state of every element, as a tree rooted at the stories.
    pub fn status(&self) -> Vec<ElementStatus> {
        self.stories.iter().map(StoryboardElement::status).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rule;
    use crate::action::{Action, CustomCommand, CustomCommandAction, SpeedAction, SpeedActionTarget};
    use crate::condition::{
        ByEntityCondition, Condition, ConditionEdge, ConditionKind, EntityCondition,
        SpeedCondition, ValueCondition,
    };
    use crate::fixtures;
    use crate::simulator::{DynamicsDimension, DynamicsShape, Sandbox, Simulator, TransitionDynamics};
    use crate::trigger::{ConditionGroup, TriggeringEntities, TriggeringEntitiesRule};

    fn at_time(name: &str, rule: Rule, value: f64) -> Trigger {
        Trigger::new(vec![ConditionGroup::new(vec![Condition::new(
            name,
            0.0,
            ConditionEdge::Rising,
            ConditionKind::Value(ValueCondition::SimulationTime { value, rule }),
        )])])
    }

    fn ego_speed(speed: f64, shape: DynamicsShape) -> Action {
        let dynamics = TransitionDynamics {
            shape,
            dimension: DynamicsDimension::Rate,
            value: 1.0,
        };
        Action::Speed(
            SpeedAction::new(
                &["ego".to_string()],
                SpeedActionTarget::Absolute(speed),
                dynamics,
                &fixtures::entities(),
            )
            .expect("speed action"),
        )
    }

    fn exit(command: CustomCommand) -> Action {
        Action::CustomCommand(CustomCommandAction::new(command, ""))
    }

    // story > act > group > maneuver > event > action
    fn story(act: StoryboardElement<Act>) -> StoryboardElement<Story> {
        StoryboardElement::new("story", Story::new(vec![act]))
    }

    fn act(events: Vec<StoryboardElement<Event>>) -> StoryboardElement<Act> {
        let maneuver = StoryboardElement::new("maneuver", Maneuver::new(events));
        let group = StoryboardElement::new(
            "group",
            ManeuverGroup::new(vec!["ego".to_string()], vec![maneuver]),
        );
        StoryboardElement::new("act", Act::new(vec![group]))
    }

    fn event(name: &str, priority: Priority, action: Action) -> StoryboardElement<Event> {
        StoryboardElement::new(
            name,
            Event::new(priority, vec![StoryboardElement::new(name, action)]),
        )
    }

    fn sandbox() -> Sandbox {
        let mut sandbox = Sandbox::new();
        sandbox.insert(fixtures::car("ego", 0.0, 0.0));
        sandbox
    }

    fn tick(storyboard: &mut Storyboard, sandbox: &mut Sandbox) {
        let snapshot = sandbox.snapshot();
        let errors = storyboard.tick(&snapshot, sandbox);
        assert!(errors.is_empty(), "{errors:?}");
        sandbox.step(0.5).expect("step");
    }

    fn event_state(storyboard: &Storyboard, name: &str) -> Option<StoryboardElementState> {
        storyboard
            .journal()
            .state(StoryboardElementType::Event, name)
    }

    #[test]
    fn override_stops_running_children() {
        // The speed ramp takes 10s, the act is stopped after 1s.
        let act = act(vec![event(
            "accelerate",
            Priority::Overwrite,
            ego_speed(10.0, DynamicsShape::Linear),
        )])
        .with_stop_trigger(at_time("after 1s", Rule::GreaterOrEqual, 1.0));
        let mut storyboard = Storyboard::new(Init::default(), vec![story(act)], Trigger::default());
        let mut sandbox = sandbox();
        tick(&mut storyboard, &mut sandbox);
        assert_eq!(
            event_state(&storyboard, "accelerate"),
            Some(StoryboardElementState::Running)
        );
        tick(&mut storyboard, &mut sandbox);
        tick(&mut storyboard, &mut sandbox);
        let status = storyboard.status();
        assert_eq!(status[0].state, StoryboardElementState::Complete);
        let act = &status[0].children[0];
        assert_eq!(act.state, StoryboardElementState::Complete);
        let maneuver = &act.children[0].children[0];
        assert_eq!(maneuver.state, StoryboardElementState::Complete);
        assert_eq!(maneuver.execution_count, 0);
        assert!(
            storyboard
                .journal()
                .transitioned(StoryboardElementType::Event, "accelerate", Transition::Stop)
        );
        // Still accelerating: the action was never accomplished.
        assert!(sandbox.status("ego").expect("ego").linear_velocity < 10.0);
        assert_eq!(storyboard.outcome(), &Outcome::Success);
    }

    #[test]
    fn outcome_is_latched() {
        let success = event("success", Priority::Parallel, exit(CustomCommand::ExitSuccess))
            .with_start_trigger(at_time("at 1s", Rule::GreaterOrEqual, 1.0));
        let failure = event(
            "failure",
            Priority::Parallel,
            exit(CustomCommand::ExitFailure),
        )
        .with_start_trigger(at_time("at 2s", Rule::GreaterOrEqual, 2.0));
        let mut storyboard = Storyboard::new(
            Init::default(),
            vec![story(act(vec![success, failure]))],
            Trigger::default(),
        );
        let mut sandbox = sandbox();
        for _ in 0..3 {
            tick(&mut storyboard, &mut sandbox);
        }
        assert_eq!(storyboard.outcome(), &Outcome::Success);
        for _ in 0..4 {
            tick(&mut storyboard, &mut sandbox);
        }
        assert_eq!(storyboard.outcome(), &Outcome::Success);
        storyboard.latch(Outcome::Failure("too late".to_string()));
        assert_eq!(storyboard.outcome(), &Outcome::Success);
    }

    #[test]
    fn skip_priority() {
        let slow = event("slow", Priority::Parallel, ego_speed(10.0, DynamicsShape::Linear));
        let skipped = event("skipped", Priority::Skip, ego_speed(1.0, DynamicsShape::Step))
            .with_start_trigger(at_time("at 1s", Rule::GreaterOrEqual, 1.0));
        let mut storyboard = Storyboard::new(
            Init::default(),
            vec![story(act(vec![slow, skipped]))],
            Trigger::default(),
        );
        let mut sandbox = sandbox();
        for _ in 0..3 {
            tick(&mut storyboard, &mut sandbox);
        }
        assert!(
            storyboard
                .journal()
                .transitioned(StoryboardElementType::Event, "skipped", Transition::Skip)
        );
        assert_eq!(
            event_state(&storyboard, "skipped"),
            Some(StoryboardElementState::Standby)
        );
        assert_eq!(
            event_state(&storyboard, "slow"),
            Some(StoryboardElementState::Running)
        );
    }

    #[test]
    fn overwrite_priority() {
        let slow = event("slow", Priority::Parallel, ego_speed(10.0, DynamicsShape::Linear));
        let brake = event("brake", Priority::Overwrite, ego_speed(0.0, DynamicsShape::Step))
            .with_start_trigger(at_time("at 1s", Rule::GreaterOrEqual, 1.0));
        let mut storyboard = Storyboard::new(
            Init::default(),
            vec![story(act(vec![slow, brake]))],
            Trigger::default(),
        );
        let mut sandbox = sandbox();
        for _ in 0..3 {
            tick(&mut storyboard, &mut sandbox);
        }
        assert_eq!(
            event_state(&storyboard, "slow"),
            Some(StoryboardElementState::Complete)
        );
        assert!(
            storyboard
                .journal()
                .transitioned(StoryboardElementType::Event, "slow", Transition::Stop)
        );
        assert_eq!(
            event_state(&storyboard, "brake"),
            Some(StoryboardElementState::Complete)
        );
        assert_eq!(sandbox.status("ego").expect("ego").linear_velocity, 0.0);
    }

    #[test]
    fn maximum_execution_count() {
        let entities = fixtures::entities();
        let moving = TriggeringEntities::new(
            TriggeringEntitiesRule::Any,
            vec!["ego".to_string()],
            &entities,
        )
        .expect("triggering entities");
        // Toggles the speed of ego between 0 and 1 m/s, three times.
        let condition = Condition::new(
            "standing",
            0.0,
            ConditionEdge::None,
            ConditionKind::Entity(ByEntityCondition::new(
                moving,
                EntityCondition::Speed(SpeedCondition::new(0.5, Rule::LessThan)),
            )),
        );
        let start = event("start", Priority::Parallel, ego_speed(1.0, DynamicsShape::Step))
            .with_start_trigger(Trigger::new(vec![ConditionGroup::new(vec![condition])]))
            .with_maximum_execution_count(3);
        let stop = event("stop", Priority::Parallel, ego_speed(0.0, DynamicsShape::Step))
            .with_start_trigger(at_time("never", Rule::LessThan, -1.0));
        let mut storyboard = Storyboard::new(
            Init::default(),
            vec![story(act(vec![start, stop]))],
            Trigger::default(),
        );
        let mut sandbox = sandbox();
        for _ in 0..6 {
            tick(&mut storyboard, &mut sandbox);
            // Brake by hand, so that the event triggers again.
            sandbox
                .apply_speed(
                    "ego",
                    &crate::simulator::SpeedTarget::Absolute(0.0),
                    &TransitionDynamics::STEP,
                    false,
                )
                .expect("brake");
        }
        let status = storyboard.status();
        let maneuver = &status[0].children[0].children[0].children[0];
        let start = &maneuver.children[0];
        assert_eq!(start.execution_count, 3);
        assert_eq!(start.state, StoryboardElementState::Complete);
        assert_eq!(storyboard.outcome(), &Outcome::Running);
    }

    #[test]
    fn init_runs_alongside_stories() {
        let mut entities = fixtures::entities();
        entities
            .add_object(fixtures::object("cone", crate::ObjectType::MiscObject))
            .expect("add cone");
        let spawn = entities.objects().cloned().collect::<Vec<_>>();
        let init = Init::new(
            spawn,
            vec![StoryboardElement::new(
                "init ego speed",
                ego_speed(5.0, DynamicsShape::Linear),
            )],
        );
        let done = event("done", Priority::Parallel, exit(CustomCommand::ExitSuccess))
            .with_start_trigger(at_time("at 1s", Rule::GreaterOrEqual, 1.0));
        let mut storyboard =
            Storyboard::new(init, vec![story(act(vec![done]))], Trigger::default());
        let mut sandbox = Sandbox::new();
        // The ramp to 5 m/s at 1 m/s² takes 5s, the story ends the scenario after 1s.
        for _ in 0..2 {
            tick(&mut storyboard, &mut sandbox);
            assert_eq!(storyboard.outcome(), &Outcome::Running);
        }
        tick(&mut storyboard, &mut sandbox);
        assert_eq!(storyboard.outcome(), &Outcome::Success);
        assert_eq!(
            storyboard
                .journal()
                .state(StoryboardElementType::Action, "init ego speed"),
            Some(StoryboardElementState::Running)
        );
        assert!(sandbox.status("ego").expect("ego").linear_velocity < 5.0);
        assert!(sandbox.status("cone").is_some());
        assert!(sandbox.status("bob").is_some());
    }

    #[test]
    fn stop_trigger_ends_continuous_init() {
        let follow = SpeedAction::new(
            &["ego".to_string()],
            SpeedActionTarget::Relative {
                entity_ref: "npc".to_string(),
                value_type: crate::simulator::SpeedTargetValueType::Delta,
                value: 0.0,
                continuous: true,
            },
            TransitionDynamics::STEP,
            &fixtures::entities(),
        )
        .expect("speed action");
        let init = Init::new(
            Vec::new(),
            vec![StoryboardElement::new("follow", Action::Speed(follow))],
        );
        let mut storyboard =
            Storyboard::new(init, Vec::new(), at_time("end", Rule::GreaterOrEqual, 1.0));
        let mut sandbox = sandbox();
        sandbox.insert(fixtures::car("npc", 20.0, 3.0));
        for _ in 0..2 {
            tick(&mut storyboard, &mut sandbox);
            assert_eq!(storyboard.outcome(), &Outcome::Running);
        }
        assert_eq!(sandbox.status("ego").expect("ego").linear_velocity, 3.0);
        tick(&mut storyboard, &mut sandbox);
        assert_eq!(storyboard.outcome(), &Outcome::Success);
        let journal = storyboard.journal();
        assert!(journal.transitioned(StoryboardElementType::Action, "follow", Transition::Stop));
        assert_eq!(
            journal.state(StoryboardElementType::Action, "follow"),
            Some(StoryboardElementState::Complete)
        );
    }

    #[test]
    fn unstarted_elements_are_in_standby() {
        let later = event("later", Priority::Parallel, ego_speed(1.0, DynamicsShape::Step))
            .with_start_trigger(at_time("at 100s", Rule::GreaterOrEqual, 100.0));
        let storyboard =
            Storyboard::new(Init::default(), vec![story(act(vec![later]))], Trigger::default());
        assert_eq!(
            event_state(&storyboard, "later"),
            Some(StoryboardElementState::Standby)
        );
        assert_eq!(
            storyboard
                .journal()
                .state(StoryboardElementType::Story, "story"),
            Some(StoryboardElementState::Standby)
        );
        assert_eq!(event_state(&storyboard, "nowhere"), None);
    }

    #[test]
    fn stop_trigger_succeeds() {
        let slow = event("slow", Priority::Parallel, ego_speed(10.0, DynamicsShape::Linear));
        let mut storyboard = Storyboard::new(
            Init::default(),
            vec![story(act(vec![slow]))],
            at_time("end", Rule::GreaterOrEqual, 1.0),
        );
        let mut sandbox = sandbox();
        tick(&mut storyboard, &mut sandbox);
        tick(&mut storyboard, &mut sandbox);
        assert_eq!(storyboard.outcome(), &Outcome::Running);
        let diagnostics = storyboard.diagnostics();
        assert!(diagnostics.iter().any(|d| d.path == "end"));
        assert!(
            diagnostics
                .iter()
                .any(|d| d.path == "story/act/group/maneuver/slow/slow")
        );
        tick(&mut storyboard, &mut sandbox);
        assert_eq!(storyboard.outcome(), &Outcome::Success);
        assert_eq!(storyboard.status()[0].state, StoryboardElementState::Complete);
    }
}
