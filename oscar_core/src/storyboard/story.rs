use super::{
    Context, Effects, ElementStatus, Maneuver, StoryboardBehavior, StoryboardElement,
    StoryboardElementType,
};
use crate::interpreter::Diagnostic;

// Containers whose children all start with them and which complete when all children do.
macro_rules! container {
    ($name:ident, $child:ty, $children:ident, $element_type:expr) => {
        impl StoryboardBehavior for $name {
            const ELEMENT_TYPE: StoryboardElementType = $element_type;

            fn start(&mut self, _ctx: &Context, _fx: &mut Effects) {}

            fn run(&mut self, ctx: &Context, fx: &mut Effects) -> bool {
                for child in self.$children.iter_mut() {
                    child.tick(ctx, fx);
                }
                self.$children.iter().all(StoryboardElement::is_complete)
            }

            fn stop(&mut self, ctx: &Context, fx: &mut Effects) {
                for child in self.$children.iter_mut() {
                    child.stop(ctx, fx);
                }
            }

            fn reset(&mut self) {
                self.$children
                    .iter_mut()
                    .for_each(StoryboardElement::<$child>::reset);
            }

            fn diagnostics(&self, path: &str, diagnostics: &mut Vec<Diagnostic>) {
                for child in &self.$children {
                    child.diagnostics(path, diagnostics);
                }
            }

            fn children(&self) -> Vec<ElementStatus> {
                self.$children
                    .iter()
                    .map(StoryboardElement::status)
                    .collect()
            }
        }
    };
}

/// Maneuvers performed by a group of actors.
#[derive(Debug, Clone)]
pub struct ManeuverGroup {
    actors: Vec<String>,
    maneuvers: Vec<StoryboardElement<Maneuver>>,
}

impl ManeuverGroup {
    /// Creates a group out of its actors (as declared) and its maneuvers.
    pub fn new(actors: Vec<String>, maneuvers: Vec<StoryboardElement<Maneuver>>) -> Self {
        Self { actors, maneuvers }
    }

    /// The entity references of the actors.
    pub fn actors(&self) -> &[String] {
        &self.actors
    }

    /// The maneuvers of the group.
    pub fn maneuvers(&self) -> &[StoryboardElement<Maneuver>] {
        &self.maneuvers
    }
}

container!(
    ManeuverGroup,
    Maneuver,
    maneuvers,
    StoryboardElementType::ManeuverGroup
);

/// A set of maneuver groups, possibly stopped early by its stop trigger.
#[derive(Debug, Clone)]
pub struct Act {
    maneuver_groups: Vec<StoryboardElement<ManeuverGroup>>,
}

impl Act {
    /// Creates an act out of its maneuver groups.
    pub fn new(maneuver_groups: Vec<StoryboardElement<ManeuverGroup>>) -> Self {
        Self { maneuver_groups }
    }

    /// The maneuver groups of the act.
    pub fn maneuver_groups(&self) -> &[StoryboardElement<ManeuverGroup>] {
        &self.maneuver_groups
    }
}

container!(
    Act,
    ManeuverGroup,
    maneuver_groups,
    StoryboardElementType::Act
);

/// A set of acts.
#[derive(Debug, Clone)]
pub struct Story {
    acts: Vec<StoryboardElement<Act>>,
}

impl Story {
    /// Creates a story out of its acts.
    pub fn new(acts: Vec<StoryboardElement<Act>>) -> Self {
        Self { acts }
    }

    /// The acts of the story.
    pub fn acts(&self) -> &[StoryboardElement<Act>] {
        &self.acts
    }
}

container!(Story, Act, acts, StoryboardElementType::Story);
