use super::{ElementStatus, StoryboardElementState, StoryboardElementType};
use hashbrown::HashMap;
use serde::Serialize;
use smallvec::SmallVec;

/// A transition between lifecycle states of a storyboard element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Transition {
    /// `standby → running`
    Start,
    /// `running → complete`, after regular completion.
    End,
    /// `* → complete`, forced by an override.
    Stop,
    /// The start trigger fired but the execution was skipped.
    Skip,
}

#[derive(Debug, Clone)]
struct Entry {
    state: StoryboardElementState,
    transitions: SmallVec<[Transition; 2]>,
}

/// Record of the states of storyboard elements and of their transitions during a tick.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: HashMap<(StoryboardElementType, String), Entry>,
}

impl Journal {
    /// Last recorded state of an element.
    pub fn state(
        &self,
        element_type: StoryboardElementType,
        name: &str,
    ) -> Option<StoryboardElementState> {
        self.entries
            .get(&(element_type, name.to_owned()))
            .map(|entry| entry.state)
    }

    /// Whether the element went through the given transition during the recorded tick.
    pub fn transitioned(
        &self,
        element_type: StoryboardElementType,
        name: &str,
        transition: Transition,
    ) -> bool {
        self.entries
            .get(&(element_type, name.to_owned()))
            .is_some_and(|entry| entry.transitions.contains(&transition))
    }

    pub(crate) fn set_state(
        &mut self,
        element_type: StoryboardElementType,
        name: &str,
        state: StoryboardElementState,
    ) {
        self.entry(element_type, name).state = state;
    }

    pub(crate) fn record(
        &mut self,
        element_type: StoryboardElementType,
        name: &str,
        transition: Transition,
    ) {
        self.entry(element_type, name).transitions.push(transition);
    }

    /// Records the current state of an element and of all its descendants.
    pub(crate) fn register(&mut self, status: &ElementStatus) {
        self.set_state(status.element_type, &status.name, status.state);
        for child in &status.children {
            self.register(child);
        }
    }

    /// Forgets the transitions, keeping the states, to start recording a new tick.
    pub(crate) fn clear_transitions(&mut self) {
        self.entries
            .values_mut()
            .for_each(|entry| entry.transitions.clear());
    }

    fn entry(&mut self, element_type: StoryboardElementType, name: &str) -> &mut Entry {
        self.entries
            .entry((element_type, name.to_owned()))
            .or_insert_with(|| Entry {
                state: StoryboardElementState::Standby,
                transitions: SmallVec::new(),
            })
    }
}
