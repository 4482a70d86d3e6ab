use crate::entities::{Entities, ScenarioObject, SemanticError};
use crate::interpreter::Outcome;
use crate::position::Position;
use crate::storyboard::{Context, Effects};
use log::{info, warn};
use std::fmt;

/// Adds a declared object to the simulation.
#[derive(Debug, Clone)]
pub struct AddEntityAction {
    object: ScenarioObject,
    position: Position,
}

impl AddEntityAction {
    /// Creates the action for a declared scenario object.
    pub fn new(
        entity_ref: &str,
        position: Position,
        entities: &Entities,
    ) -> Result<Self, SemanticError> {
        let object = entities
            .object(entity_ref)
            .ok_or_else(|| SemanticError::UnknownEntity(entity_ref.to_owned()))?
            .clone();
        Ok(Self { object, position })
    }

    /// The object to add.
    pub fn object(&self) -> &ScenarioObject {
        &self.object
    }

    pub(super) fn start(&mut self, ctx: &Context, fx: &mut Effects) {
        let position = self.position.resolve(ctx.snapshot);
        if position.is_none() {
            warn!(target: "storyboard", "AddEntityAction: cannot resolve {}", self.position);
        }
        fx.issue(|commands| commands.spawn(&self.object, position.as_ref()));
    }
}

impl fmt::Display for AddEntityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "add {} at {}", self.object.name, self.position)
    }
}

/// Removes entities from the simulation.
#[derive(Debug, Clone)]
pub struct DeleteEntityAction {
    entity_ref: String,
    objects: Vec<String>,
}

impl DeleteEntityAction {
    /// Creates the action for a declared object or selection.
    pub fn new(entity_ref: &str, entities: &Entities) -> Result<Self, SemanticError> {
        Ok(Self {
            entity_ref: entity_ref.to_owned(),
            objects: entities.expand(entity_ref)?,
        })
    }

    pub(super) fn start(&mut self, fx: &mut Effects) {
        for object in &self.objects {
            fx.issue(|commands| commands.despawn(object));
        }
    }
}

impl fmt::Display for DeleteEntityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delete {}", self.entity_ref)
    }
}

/// The commands understood by [`CustomCommandAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomCommand {
    /// Ends the scenario with success.
    ExitSuccess,
    /// Ends the scenario with failure.
    ExitFailure,
}

impl CustomCommand {
    /// Parses the type of a custom command as found in documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "exitSuccess" => Some(CustomCommand::ExitSuccess),
            "exitFailure" => Some(CustomCommand::ExitFailure),
            _ => None,
        }
    }
}

/// Ends the scenario.
#[derive(Debug, Clone)]
pub struct CustomCommandAction {
    command: CustomCommand,
    content: String,
}

impl CustomCommandAction {
    /// Creates the action; `content` is the reason reported on failure.
    pub fn new(command: CustomCommand, content: &str) -> Self {
        Self {
            command,
            content: content.trim().to_owned(),
        }
    }

    pub(super) fn start(&mut self, fx: &mut Effects) {
        let outcome = match self.command {
            CustomCommand::ExitSuccess => Outcome::Success,
            CustomCommand::ExitFailure if self.content.is_empty() => {
                Outcome::Failure("exitFailure".to_owned())
            }
            CustomCommand::ExitFailure => Outcome::Failure(self.content.clone()),
        };
        info!(target: "storyboard", "{self}");
        fx.latch(outcome);
    }
}

impl fmt::Display for CustomCommandAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.command {
            CustomCommand::ExitSuccess => write!(f, "exitSuccess"),
            CustomCommand::ExitFailure => write!(f, "exitFailure {}", self.content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::simulator::{Sandbox, Simulator, Snapshot};
    use crate::storyboard::Journal;

    #[test]
    fn add_and_delete() {
        let entities = fixtures::entities();
        let mut add = AddEntityAction::new(
            "npc",
            Position::World(fixtures::pose(5.0, 1.0, 0.0)),
            &entities,
        )
        .expect("add entity");
        let mut delete = DeleteEntityAction::new("npc", &entities).expect("delete entity");
        let mut sandbox = Sandbox::new();
        let journal = Journal::default();
        let mut pending = Journal::default();
        let mut outcome = Outcome::Running;
        let snapshot = Snapshot::new(0.0);
        let ctx = Context {
            snapshot: &snapshot,
            journal: &journal,
        };
        let mut fx = Effects::new(&mut sandbox, &mut pending, &mut outcome);
        add.start(&ctx, &mut fx);
        // Adding twice is reported.
        add.start(&ctx, &mut fx);
        assert_eq!(fx.into_errors().len(), 1);
        assert_eq!(
            sandbox.status("npc").map(|npc| npc.pose.position.x),
            Some(5.0)
        );
        let mut fx = Effects::new(&mut sandbox, &mut pending, &mut outcome);
        delete.start(&mut fx);
        assert!(fx.into_errors().is_empty());
        assert!(!sandbox.snapshot().exists("npc"));
        assert!(AddEntityAction::new("ghost", Position::World(Default::default()), &entities).is_err());
    }

    #[test]
    fn exit_failure_reason() {
        let mut sandbox = Sandbox::new();
        let mut journal = Journal::default();
        let mut outcome = Outcome::Running;
        let mut fx = Effects::new(&mut sandbox, &mut journal, &mut outcome);
        CustomCommandAction::new(CustomCommand::ExitFailure, " ego crashed ").start(&mut fx);
        CustomCommandAction::new(CustomCommand::ExitSuccess, "").start(&mut fx);
        assert_eq!(fx.outcome(), &Outcome::Failure("ego crashed".to_string()));
    }
}
