//! Registry of the entities declared by a scenario.
//!
//! The registry only knows names, object types and dimensions.
//! Whether an entity currently exists in the simulation is a property of the
//! [`Snapshot`](crate::simulator::Snapshot) of each tick.

use crate::math::BoundingBox;
use hashbrown::HashMap;
use log::trace;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors of documents that are well-formed but describe an invalid scenario.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SemanticError {
    /// An entity reference does not name any declared entity or selection.
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),
    /// Two entities (or selections) are declared with the same name.
    #[error("entity `{0}` declared multiple times")]
    DuplicateEntity(String),
    /// An action is given actors of a type it cannot act upon.
    #[error("actor `{actor}` cannot perform `{action}`: {reason}")]
    InvalidActor {
        /// The offending actor.
        actor: String,
        /// The action being built.
        action: &'static str,
        /// Which constraint is violated.
        reason: &'static str,
    },
    /// An action needs at least one actor.
    #[error("`{0}` has no actors")]
    NoActors(&'static str),
}

/// The type of a scenario object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ObjectType {
    /// A vehicle (possibly the ego vehicle).
    Vehicle,
    /// A pedestrian.
    Pedestrian,
    /// Any other object (obstacles, barriers, ...).
    MiscObject,
}

impl ObjectType {
    /// Parses the name of an object type as found in documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "vehicle" => Some(ObjectType::Vehicle),
            "pedestrian" => Some(ObjectType::Pedestrian),
            "miscellaneous" | "miscObject" => Some(ObjectType::MiscObject),
            _ => None,
        }
    }
}

/// A single simulated object declared by the scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioObject {
    /// Unique name.
    pub name: String,
    /// Type of object.
    pub object_type: ObjectType,
    /// Dimensions of the object, relative to its reference point.
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Clone)]
enum Entity {
    Object(ScenarioObject),
    Selection(Vec<String>),
}

/// Registry of declared scenario objects and entity selections.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    entities: HashMap<String, Entity>,
    // Declaration order, used to spawn objects deterministically.
    order: Vec<String>,
}

impl Entities {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a new scenario object.
    pub fn add_object(&mut self, object: ScenarioObject) -> Result<(), SemanticError> {
        if self.entities.contains_key(&object.name) {
            return Err(SemanticError::DuplicateEntity(object.name));
        }
        trace!(target: "builder", "declare object '{}' ({:?})", object.name, object.object_type);
        self.order.push(object.name.clone());
        self.entities
            .insert(object.name.clone(), Entity::Object(object));
        Ok(())
    }

    /// Declares a named selection of entities.
    ///
    /// Members may be objects or other, already declared, selections.
    pub fn add_selection(&mut self, name: &str, members: Vec<String>) -> Result<(), SemanticError> {
        if self.entities.contains_key(name) {
            return Err(SemanticError::DuplicateEntity(name.to_owned()));
        }
        for member in &members {
            if !self.entities.contains_key(member) {
                return Err(SemanticError::UnknownEntity(member.to_owned()));
            }
        }
        self.entities
            .insert(name.to_owned(), Entity::Selection(members));
        Ok(())
    }

    /// Returns whether the name refers to a declared object or selection.
    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Returns the declared object with the given name, if any.
    pub fn object(&self, name: &str) -> Option<&ScenarioObject> {
        match self.entities.get(name) {
            Some(Entity::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// Iterates over the declared objects, in declaration order.
    pub fn objects(&self) -> impl Iterator<Item = &ScenarioObject> {
        self.order.iter().filter_map(|name| self.object(name))
    }

    /// Expands an entity reference into the names of the objects it denotes.
    ///
    /// An object denotes itself, a selection denotes all of its members (recursively).
    pub fn expand(&self, name: &str) -> Result<Vec<String>, SemanticError> {
        let mut objects = Vec::new();
        self.expand_into(name, &mut objects)?;
        Ok(objects)
    }

    fn expand_into(&self, name: &str, objects: &mut Vec<String>) -> Result<(), SemanticError> {
        match self.entities.get(name) {
            Some(Entity::Object(object)) => {
                if !objects.contains(&object.name) {
                    objects.push(object.name.clone());
                }
                Ok(())
            }
            Some(Entity::Selection(members)) => members
                .iter()
                .try_for_each(|member| self.expand_into(member, objects)),
            None => Err(SemanticError::UnknownEntity(name.to_owned())),
        }
    }

    /// The set of object types denoted by an entity reference.
    pub fn object_types(&self, name: &str) -> Result<BTreeSet<ObjectType>, SemanticError> {
        Ok(self
            .expand(name)?
            .iter()
            .filter_map(|object| self.object(object))
            .map(|object| object.object_type)
            .collect())
    }

    /// Checks that each actor denotes only vehicles or only pedestrians,
    /// as required by motion actions.
    pub fn check_motion_actors(
        &self,
        action: &'static str,
        actors: &[String],
    ) -> Result<(), SemanticError> {
        if actors.is_empty() {
            return Err(SemanticError::NoActors(action));
        }
        for actor in actors {
            let types = self.object_types(actor)?;
            if types != BTreeSet::from([ObjectType::Vehicle])
                && types != BTreeSet::from([ObjectType::Pedestrian])
            {
                return Err(SemanticError::InvalidActor {
                    actor: actor.clone(),
                    action,
                    reason: "actors may be either of vehicle type or of pedestrian type",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(name: &str, object_type: ObjectType) -> ScenarioObject {
        ScenarioObject {
            name: name.to_string(),
            object_type,
            bounding_box: BoundingBox::default(),
        }
    }

    #[test]
    fn selections() {
        let mut entities = Entities::new();
        entities
            .add_object(object("ego", ObjectType::Vehicle))
            .expect("add ego");
        entities
            .add_object(object("npc", ObjectType::Vehicle))
            .expect("add npc");
        entities
            .add_object(object("bob", ObjectType::Pedestrian))
            .expect("add bob");
        entities
            .add_selection("cars", vec!["ego".into(), "npc".into()])
            .expect("add cars");
        entities
            .add_selection("everyone", vec!["cars".into(), "bob".into(), "ego".into()])
            .expect("add everyone");
        assert_eq!(
            entities.expand("everyone").expect("expand"),
            vec!["ego", "npc", "bob"]
        );
        assert!(entities.check_motion_actors("SpeedAction", &["cars".to_string()]).is_ok());
        assert!(matches!(
            entities.check_motion_actors("SpeedAction", &["everyone".to_string()]),
            Err(SemanticError::InvalidActor { .. })
        ));
        assert_eq!(
            entities.expand("nobody"),
            Err(SemanticError::UnknownEntity("nobody".to_string()))
        );
    }

    #[test]
    fn misc_objects_do_not_move() {
        let mut entities = Entities::new();
        entities
            .add_object(object("cone", ObjectType::MiscObject))
            .expect("add cone");
        assert!(matches!(
            entities.check_motion_actors("SpeedAction", &["cone".to_string()]),
            Err(SemanticError::InvalidActor { .. })
        ));
        assert_eq!(
            entities.check_motion_actors("SpeedAction", &[]),
            Err(SemanticError::NoActors("SpeedAction"))
        );
    }
}
