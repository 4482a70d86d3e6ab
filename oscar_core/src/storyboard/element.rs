use super::{
    Context, Effects, ElementStatus, StoryboardElementState, StoryboardElementType, Transition,
};
use crate::interpreter::Diagnostic;
use crate::trigger::Trigger;
use log::{debug, info};

/// The element-specific behavior wrapped by a [`StoryboardElement`].
pub trait StoryboardBehavior {
    /// Type of the element, as referenced by storyboard element state conditions.
    const ELEMENT_TYPE: StoryboardElementType;

    /// One-time work done when the element starts.
    fn start(&mut self, ctx: &Context, fx: &mut Effects);

    /// Advances a running element by one tick, and returns whether it has completed.
    fn run(&mut self, ctx: &Context, fx: &mut Effects) -> bool;

    /// Drives every child that is not complete through `stopping → complete`.
    fn stop(&mut self, ctx: &Context, fx: &mut Effects);

    /// Re-arms the element (and its children) for another execution.
    fn reset(&mut self);

    /// Diagnostics of the active children.
    fn diagnostics(&self, path: &str, diagnostics: &mut Vec<Diagnostic>);

    /// Status of the children.
    fn children(&self) -> Vec<ElementStatus>;
}

/// Lifecycle wrapper common to all storyboard elements.
#[derive(Debug, Clone)]
pub struct StoryboardElement<T> {
    name: String,
    state: StoryboardElementState,
    // `None` means the element starts as soon as its parent runs it.
    start_trigger: Option<Trigger>,
    stop_trigger: Option<Trigger>,
    maximum_execution_count: usize,
    execution_count: usize,
    inner: T,
}

impl<T: StoryboardBehavior> StoryboardElement<T> {
    /// Wraps an element, in standby, executing once, without triggers.
    pub fn new(name: &str, inner: T) -> Self {
        Self {
            name: name.to_owned(),
            state: StoryboardElementState::Standby,
            start_trigger: None,
            stop_trigger: None,
            maximum_execution_count: 1,
            execution_count: 0,
            inner,
        }
    }

    /// Sets the trigger starting the element.
    pub fn with_start_trigger(mut self, trigger: Trigger) -> Self {
        self.start_trigger = Some(trigger);
        self
    }

    /// Sets the trigger stopping the element (and its children) while it runs.
    pub fn with_stop_trigger(mut self, trigger: Trigger) -> Self {
        self.stop_trigger = Some(trigger);
        self
    }

    /// Sets how many times the element executes before completing for good.
    pub fn with_maximum_execution_count(mut self, count: usize) -> Self {
        self.maximum_execution_count = count.max(1);
        self
    }

    /// Name of the element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StoryboardElementState {
        self.state
    }

    /// Number of completed executions.
    pub fn execution_count(&self) -> usize {
        self.execution_count
    }

    /// The wrapped element.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Whether the element is done for good.
    pub fn is_complete(&self) -> bool {
        self.state == StoryboardElementState::Complete
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state == StoryboardElementState::Running
    }

    /// Processes one tick: starts the element if it is in standby and its start trigger fires,
    /// then advances it if running.
    pub(crate) fn tick(&mut self, ctx: &Context, fx: &mut Effects) {
        if self.state == StoryboardElementState::Standby {
            if !self.start_triggered(ctx) {
                return;
            }
            self.begin(ctx, fx);
        }
        self.advance(ctx, fx);
    }

    /// Evaluates the start trigger of an element in standby.
    pub(crate) fn start_triggered(&mut self, ctx: &Context) -> bool {
        self.state == StoryboardElementState::Standby
            && self
                .start_trigger
                .as_mut()
                .is_none_or(|trigger| trigger.evaluate(ctx))
    }

    pub(crate) fn begin(&mut self, ctx: &Context, fx: &mut Effects) {
        info!(target: "storyboard", "{} '{}' starts at {}", T::ELEMENT_TYPE, self.name, ctx.snapshot.time);
        self.set_state(StoryboardElementState::Starting, fx);
        fx.journal
            .record(T::ELEMENT_TYPE, &self.name, Transition::Start);
        self.inner.start(ctx, fx);
        self.set_state(StoryboardElementState::Running, fx);
    }

    pub(crate) fn skip(&mut self, fx: &mut Effects) {
        debug!(target: "storyboard", "{} '{}' skipped", T::ELEMENT_TYPE, self.name);
        fx.journal
            .record(T::ELEMENT_TYPE, &self.name, Transition::Skip);
    }

    pub(crate) fn advance(&mut self, ctx: &Context, fx: &mut Effects) {
        if self.state != StoryboardElementState::Running {
            return;
        }
        if self
            .stop_trigger
            .as_mut()
            .is_some_and(|trigger| trigger.evaluate(ctx))
        {
            self.stop(ctx, fx);
        } else if self.inner.run(ctx, fx) {
            self.end(ctx, fx);
        }
    }

    fn end(&mut self, ctx: &Context, fx: &mut Effects) {
        self.set_state(StoryboardElementState::Stopping, fx);
        self.execution_count += 1;
        fx.journal
            .record(T::ELEMENT_TYPE, &self.name, Transition::End);
        info!(target: "storyboard", "{} '{}' ends at {}", T::ELEMENT_TYPE, self.name, ctx.snapshot.time);
        if self.execution_count < self.maximum_execution_count {
            debug!(
                target: "storyboard",
                "{} '{}' re-armed ({}/{} executions)",
                T::ELEMENT_TYPE, self.name, self.execution_count, self.maximum_execution_count
            );
            self.rearm();
            fx.journal.register(&self.status());
        } else {
            self.set_state(StoryboardElementState::Complete, fx);
        }
    }

    /// Override: forces the element and its descendants to `complete`,
    /// regardless of whether they have accomplished their goal.
    pub(crate) fn stop(&mut self, ctx: &Context, fx: &mut Effects) {
        if self.state == StoryboardElementState::Complete {
            return;
        }
        info!(target: "storyboard", "{} '{}' stopped at {}", T::ELEMENT_TYPE, self.name, ctx.snapshot.time);
        self.set_state(StoryboardElementState::Stopping, fx);
        self.inner.stop(ctx, fx);
        fx.journal
            .record(T::ELEMENT_TYPE, &self.name, Transition::Stop);
        self.set_state(StoryboardElementState::Complete, fx);
    }

    fn rearm(&mut self) {
        self.state = StoryboardElementState::Standby;
        if let Some(trigger) = self.start_trigger.as_mut() {
            trigger.reset();
        }
        if let Some(trigger) = self.stop_trigger.as_mut() {
            trigger.reset();
        }
        self.inner.reset();
    }

    /// Re-arms the element for a new execution of its parent, forgetting past executions.
    pub(crate) fn reset(&mut self) {
        self.execution_count = 0;
        self.rearm();
    }

    fn set_state(&mut self, state: StoryboardElementState, fx: &mut Effects) {
        self.state = state;
        fx.journal.set_state(T::ELEMENT_TYPE, &self.name, state);
    }

    pub(crate) fn diagnostics(&self, parent: &str, diagnostics: &mut Vec<Diagnostic>) {
        let path = if parent.is_empty() {
            self.name.clone()
        } else {
            format!("{parent}/{}", self.name)
        };
        let trigger = match self.state {
            StoryboardElementState::Standby => self.start_trigger.as_ref(),
            StoryboardElementState::Running => self.stop_trigger.as_ref(),
            _ => None,
        };
        if let Some(trigger) = trigger {
            diagnostics.extend(trigger.conditions().map(|condition| Diagnostic {
                path: format!("{path}/{}", condition.name()),
                state: self.state,
                description: condition.description(),
            }));
        }
        if self.state == StoryboardElementState::Running {
            self.inner.diagnostics(&path, diagnostics);
        }
    }

    pub(crate) fn status(&self) -> ElementStatus {
        ElementStatus {
            name: self.name.clone(),
            element_type: T::ELEMENT_TYPE,
            state: self.state,
            execution_count: self.execution_count,
            children: self.inner.children(),
        }
    }
}
