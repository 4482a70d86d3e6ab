use super::{
    Context, Effects, ElementStatus, StoryboardBehavior, StoryboardElement, StoryboardElementType,
};
use crate::action::Action;
use crate::interpreter::Diagnostic;
use log::debug;

impl StoryboardBehavior for Action {
    const ELEMENT_TYPE: StoryboardElementType = StoryboardElementType::Action;

    fn start(&mut self, ctx: &Context, fx: &mut Effects) {
        Action::start(self, ctx, fx);
    }

    fn run(&mut self, ctx: &Context, fx: &mut Effects) -> bool {
        Action::run(self, ctx, fx);
        self.accomplished(ctx)
    }

    fn stop(&mut self, _ctx: &Context, _fx: &mut Effects) {}

    fn reset(&mut self) {}

    fn diagnostics(&self, path: &str, diagnostics: &mut Vec<Diagnostic>) {
        diagnostics.push(Diagnostic {
            path: path.to_owned(),
            state: super::StoryboardElementState::Running,
            description: self.description(),
        });
    }

    fn children(&self) -> Vec<ElementStatus> {
        Vec::new()
    }
}

/// How an event starting interacts with the other running events of its maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Stops the running sibling events.
    #[default]
    Overwrite,
    /// Does not start while a sibling event runs.
    Skip,
    /// Starts regardless of its siblings.
    Parallel,
}

impl Priority {
    /// Parses the name of a priority as found in documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            // `override` is the newer name of `overwrite`.
            "overwrite" | "override" => Some(Priority::Overwrite),
            "skip" => Some(Priority::Skip),
            "parallel" => Some(Priority::Parallel),
            _ => None,
        }
    }
}

/// A set of actions started together, completing when all of them do.
#[derive(Debug, Clone)]
pub struct Event {
    priority: Priority,
    actions: Vec<StoryboardElement<Action>>,
}

impl Event {
    /// Creates an event out of its actions.
    pub fn new(priority: Priority, actions: Vec<StoryboardElement<Action>>) -> Self {
        Self { priority, actions }
    }

    /// The priority of the event.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// The actions of the event.
    pub fn actions(&self) -> &[StoryboardElement<Action>] {
        &self.actions
    }
}

impl StoryboardBehavior for Event {
    const ELEMENT_TYPE: StoryboardElementType = StoryboardElementType::Event;

    fn start(&mut self, _ctx: &Context, _fx: &mut Effects) {}

    fn run(&mut self, ctx: &Context, fx: &mut Effects) -> bool {
        for action in self.actions.iter_mut() {
            action.tick(ctx, fx);
        }
        self.actions.iter().all(StoryboardElement::is_complete)
    }

    fn stop(&mut self, ctx: &Context, fx: &mut Effects) {
        for action in self.actions.iter_mut() {
            action.stop(ctx, fx);
        }
    }

    fn reset(&mut self) {
        self.actions.iter_mut().for_each(StoryboardElement::reset);
    }

    fn diagnostics(&self, path: &str, diagnostics: &mut Vec<Diagnostic>) {
        for action in &self.actions {
            action.diagnostics(path, diagnostics);
        }
    }

    fn children(&self) -> Vec<ElementStatus> {
        self.actions.iter().map(StoryboardElement::status).collect()
    }
}

/// A set of events, completing when all of them do.
#[derive(Debug, Clone)]
pub struct Maneuver {
    events: Vec<StoryboardElement<Event>>,
}

impl Maneuver {
    /// Creates a maneuver out of its events.
    pub fn new(events: Vec<StoryboardElement<Event>>) -> Self {
        Self { events }
    }

    /// The events of the maneuver.
    pub fn events(&self) -> &[StoryboardElement<Event>] {
        &self.events
    }
}

impl StoryboardBehavior for Maneuver {
    const ELEMENT_TYPE: StoryboardElementType = StoryboardElementType::Maneuver;

    fn start(&mut self, _ctx: &Context, _fx: &mut Effects) {}

    fn run(&mut self, ctx: &Context, fx: &mut Effects) -> bool {
        for index in 0..self.events.len() {
            if self.events[index].start_triggered(ctx) {
                let sibling_running = self
                    .events
                    .iter()
                    .enumerate()
                    .any(|(other, event)| other != index && event.is_running());
                match self.events[index].inner().priority() {
                    Priority::Skip if sibling_running => {
                        self.events[index].skip(fx);
                        continue;
                    }
                    Priority::Overwrite if sibling_running => {
                        debug!(
                            target: "storyboard",
                            "event '{}' overwrites its running siblings",
                            self.events[index].name()
                        );
                        for (other, event) in self.events.iter_mut().enumerate() {
                            if other != index && event.is_running() {
                                event.stop(ctx, fx);
                            }
                        }
                    }
                    _ => {}
                }
                self.events[index].begin(ctx, fx);
            }
            self.events[index].advance(ctx, fx);
        }
        self.events.iter().all(StoryboardElement::is_complete)
    }

    fn stop(&mut self, ctx: &Context, fx: &mut Effects) {
        for event in self.events.iter_mut() {
            event.stop(ctx, fx);
        }
    }

    fn reset(&mut self) {
        self.events.iter_mut().for_each(StoryboardElement::reset);
    }

    fn diagnostics(&self, path: &str, diagnostics: &mut Vec<Diagnostic>) {
        for event in &self.events {
            event.diagnostics(path, diagnostics);
        }
    }

    fn children(&self) -> Vec<ElementStatus> {
        self.events.iter().map(StoryboardElement::status).collect()
    }
}
