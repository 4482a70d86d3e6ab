//! Triggers, condition groups and triggering entities.
//!
//! A [`Trigger`] fires when any of its [`ConditionGroup`]s holds,
//! and a group holds when all of its [`Condition`]s hold.
//! Conditions keep their own edge-detection and delay state across ticks,
//! so every condition is evaluated at every tick, without short-circuiting.

use crate::condition::Condition;
use crate::entities::{Entities, SemanticError};
use crate::simulator::{EntityStatus, Snapshot};
use crate::storyboard::Context;
use log::trace;
use smallvec::SmallVec;

/// Measurements taken by a condition at the current tick:
/// one list per entity reference, with one value per existing object it denotes.
pub type Measurements<T> = Vec<SmallVec<[T; 4]>>;

/// How the results of the individual triggering entities combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggeringEntitiesRule {
    /// At least one entity must satisfy the condition.
    Any,
    /// Every entity must satisfy the condition.
    All,
}

impl TriggeringEntitiesRule {
    /// Parses the name of a rule as found in documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "any" => Some(TriggeringEntitiesRule::Any),
            "all" => Some(TriggeringEntitiesRule::All),
            _ => None,
        }
    }
}

/// An entity reference, together with the objects it denotes.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRef {
    /// Referenced object or selection.
    pub name: String,
    /// Objects denoted by the reference.
    pub objects: Vec<String>,
}

/// The entities a condition is evaluated on.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeringEntities {
    rule: TriggeringEntitiesRule,
    entity_refs: Vec<EntityRef>,
}

impl TriggeringEntities {
    /// Resolves the given entity references against the registry.
    pub fn new(
        rule: TriggeringEntitiesRule,
        names: Vec<String>,
        entities: &Entities,
    ) -> Result<Self, SemanticError> {
        let entity_refs = names
            .into_iter()
            .map(|name| {
                entities
                    .expand(&name)
                    .map(|objects| EntityRef { name, objects })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rule, entity_refs })
    }

    /// The combination rule.
    pub fn rule(&self) -> TriggeringEntitiesRule {
        self.rule
    }

    /// The entity references.
    pub fn entity_refs(&self) -> &[EntityRef] {
        &self.entity_refs
    }

    /// Measures each object denoted by each reference and tests the measurement.
    ///
    /// Objects that do not exist in the snapshot are skipped.
    /// A reference holds when it denotes at least one existing object,
    /// and every existing object passes the test.
    /// References then combine according to the rule.
    /// The measurements are stored in `measurements` for diagnostics.
    pub fn evaluate<T, M, P>(
        &self,
        snapshot: &Snapshot,
        measurements: &mut Measurements<T>,
        mut measure: M,
        mut test: P,
    ) -> bool
    where
        T: Copy,
        M: FnMut(&EntityStatus) -> T,
        P: FnMut(T) -> bool,
    {
        measurements.clear();
        let results = self
            .entity_refs
            .iter()
            .map(|entity_ref| {
                let values = entity_ref
                    .objects
                    .iter()
                    .filter_map(|object| snapshot.status(object))
                    .map(&mut measure)
                    .collect::<SmallVec<[T; 4]>>();
                let holds = !values.is_empty() && values.iter().all(|value| test(*value));
                measurements.push(values);
                holds
            })
            .collect::<SmallVec<[bool; 4]>>();
        match self.rule {
            TriggeringEntitiesRule::Any => results.iter().any(|b| *b),
            TriggeringEntitiesRule::All => !results.is_empty() && results.iter().all(|b| *b),
        }
    }

    /// Human-readable description of the triggering entities, e.g. `any of [ego, npc]`.
    pub fn description(&self) -> String {
        let names = self
            .entity_refs
            .iter()
            .map(|entity_ref| entity_ref.name.as_str())
            .collect::<Vec<_>>();
        match (self.rule, names.as_slice()) {
            (_, [name]) => (*name).to_owned(),
            (TriggeringEntitiesRule::Any, names) => format!("any of [{}]", names.join(", ")),
            (TriggeringEntitiesRule::All, names) => format!("all of [{}]", names.join(", ")),
        }
    }
}

/// A conjunction of conditions.
#[derive(Debug, Clone, Default)]
pub struct ConditionGroup {
    conditions: Vec<Condition>,
}

impl ConditionGroup {
    /// Creates a group out of its conditions.
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    /// The conditions of the group.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Whether all conditions hold at the current tick.
    ///
    /// An empty group never holds.
    pub fn evaluate(&mut self, ctx: &Context) -> bool {
        let results = self
            .conditions
            .iter_mut()
            .map(|condition| condition.evaluate(ctx))
            .collect::<SmallVec<[bool; 8]>>();
        !results.is_empty() && results.iter().all(|b| *b)
    }

    fn reset(&mut self) {
        self.conditions.iter_mut().for_each(Condition::reset);
    }
}

/// A disjunction of condition groups.
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    groups: Vec<ConditionGroup>,
}

impl Trigger {
    /// Creates a trigger out of its condition groups.
    pub fn new(groups: Vec<ConditionGroup>) -> Self {
        Self { groups }
    }

    /// The condition groups of the trigger.
    pub fn groups(&self) -> &[ConditionGroup] {
        &self.groups
    }

    /// Whether any group holds at the current tick.
    ///
    /// A trigger without groups never fires.
    pub fn evaluate(&mut self, ctx: &Context) -> bool {
        let results = self
            .groups
            .iter_mut()
            .map(|group| group.evaluate(ctx))
            .collect::<SmallVec<[bool; 4]>>();
        let fired = results.iter().any(|b| *b);
        if fired {
            trace!(target: "storyboard", "trigger fired at {}", ctx.snapshot.time);
        }
        fired
    }

    /// Re-arms every condition of the trigger.
    pub fn reset(&mut self) {
        self.groups.iter_mut().for_each(ConditionGroup::reset);
    }

    /// Iterates over all conditions of the trigger.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.groups.iter().flat_map(|group| group.conditions.iter())
    }
}
