use super::{LoadContext, unsupported};
use crate::parser::*;
use anyhow::Context;
use log::{trace, warn};
use oscar_core::Rule;
use oscar_core::condition::*;
use oscar_core::entities::ObjectType;
use oscar_core::scope::FrameId;
use oscar_core::storyboard::StoryboardElementType;
use oscar_core::trigger::{
    ConditionGroup, EntityRef, Trigger, TriggeringEntities, TriggeringEntitiesRule,
};

impl LoadContext {
    /// Builds a `StartTrigger` or `StopTrigger`.
    pub(super) fn trigger(&self, frame: FrameId, element: &Element) -> anyhow::Result<Trigger> {
        let groups = element
            .children
            .iter()
            .map(|group| match group.tag.as_str() {
                TAG_CONDITION_GROUP => group
                    .children
                    .iter()
                    .map(|condition| match condition.tag.as_str() {
                        TAG_CONDITION => self.condition(frame, condition),
                        _ => Err(unsupported(condition)),
                    })
                    .collect::<anyhow::Result<Vec<_>>>()
                    .map(ConditionGroup::new),
                _ => Err(unsupported(group)),
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        if groups.is_empty() {
            warn!(target: "builder", "'{}' at line {} has no condition groups and never fires", element.tag, element.line);
        }
        Ok(Trigger::new(groups))
    }

    fn condition(&self, frame: FrameId, element: &Element) -> anyhow::Result<Condition> {
        let attrs = self.attrs(frame, element);
        let name = attrs.string(ATTR_NAME)?;
        let delay = attrs.opt_double(ATTR_DELAY)?.unwrap_or_default();
        let edge = attrs
            .opt_enumeration(ATTR_CONDITION_EDGE, ConditionEdge::from_name, "condition edge")?
            .unwrap_or_default();
        let choice = element.choice()?;
        let kind = match choice.tag.as_str() {
            TAG_BY_ENTITY_CONDITION => self
                .by_entity_condition(frame, choice)
                .map(ConditionKind::Entity),
            TAG_BY_VALUE_CONDITION => self
                .by_value_condition(frame, choice)
                .map(ConditionKind::Value),
            _ => Err(unsupported(choice)),
        }
        .with_context(|| format!("failed to build condition '{name}' at line {}", element.line))?;
        trace!(target: "builder", "condition '{name}': {kind}");
        Ok(Condition::new(&name, delay, edge, kind))
    }

    fn by_entity_condition(
        &self,
        frame: FrameId,
        element: &Element,
    ) -> anyhow::Result<ByEntityCondition> {
        let triggering = element.required(TAG_TRIGGERING_ENTITIES)?;
        let rule = self.attrs(frame, triggering).enumeration(
            ATTR_TRIGGERING_ENTITIES_RULE,
            TriggeringEntitiesRule::from_name,
            "triggering entities rule",
        )?;
        let names = triggering
            .children_named(TAG_ENTITY_REF)
            .map(|entity_ref| self.attrs(frame, entity_ref).string(ATTR_ENTITY_REF))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let triggering_entities = TriggeringEntities::new(rule, names, &self.entities)?;

        let choice = element.required(TAG_ENTITY_CONDITION)?.choice()?;
        let attrs = self.attrs(frame, choice);
        let rule = || attrs.enumeration(ATTR_RULE, Rule::from_name, "rule");
        let freespace = || attrs.boolean(ATTR_FREESPACE);
        let condition = match choice.tag.as_str() {
            TAG_COLLISION_CONDITION => {
                let target = choice.choice()?;
                let target = match target.tag.as_str() {
                    TAG_ENTITY_REF => {
                        let name = self.attrs(frame, target).string(ATTR_ENTITY_REF)?;
                        let objects = self.entities.expand(&name)?;
                        CollisionTarget::Entity(EntityRef { name, objects })
                    }
                    TAG_BY_TYPE => CollisionTarget::ByType(self.attrs(frame, target).enumeration(
                        ATTR_OBJECT_TYPE,
                        ObjectType::from_name,
                        "object type",
                    )?),
                    _ => return Err(unsupported(target)),
                };
                EntityCondition::Collision(CollisionCondition::new(target))
            }
            TAG_TIME_HEADWAY_CONDITION => {
                let entity_ref = attrs.string(ATTR_ENTITY_REF)?;
                self.check_entity(&entity_ref)?;
                EntityCondition::TimeHeadway(TimeHeadwayCondition::new(
                    &entity_ref,
                    attrs.double(ATTR_VALUE)?,
                    rule()?,
                    freespace()?,
                ))
            }
            TAG_ACCELERATION_CONDITION => EntityCondition::Acceleration(
                AccelerationCondition::new(attrs.double(ATTR_VALUE)?, rule()?),
            ),
            TAG_STAND_STILL_CONDITION => EntityCondition::StandStill(StandStillCondition::new(
                attrs.double(ATTR_DURATION)?,
            )),
            TAG_SPEED_CONDITION => {
                EntityCondition::Speed(SpeedCondition::new(attrs.double(ATTR_VALUE)?, rule()?))
            }
            TAG_REACH_POSITION_CONDITION => {
                EntityCondition::ReachPosition(ReachPositionCondition::new(
                    self.position(frame, choice.required(TAG_POSITION)?)?,
                    attrs.double(ATTR_TOLERANCE)?,
                ))
            }
            TAG_DISTANCE_CONDITION => EntityCondition::Distance(DistanceCondition::new(
                self.position(frame, choice.required(TAG_POSITION)?)?,
                attrs.double(ATTR_VALUE)?,
                rule()?,
                freespace()?,
            )),
            TAG_RELATIVE_DISTANCE_CONDITION => {
                let entity_ref = attrs.string(ATTR_ENTITY_REF)?;
                self.check_entity(&entity_ref)?;
                EntityCondition::RelativeDistance(RelativeDistanceCondition::new(
                    &entity_ref,
                    attrs.enumeration(
                        ATTR_RELATIVE_DISTANCE_TYPE,
                        RelativeDistanceType::from_name,
                        "relative distance type",
                    )?,
                    attrs.double(ATTR_VALUE)?,
                    rule()?,
                    freespace()?,
                ))
            }
            _ => return Err(unsupported(choice)),
        };
        Ok(ByEntityCondition::new(triggering_entities, condition))
    }

    fn by_value_condition(&self, frame: FrameId, element: &Element) -> anyhow::Result<ValueCondition> {
        let choice = element.choice()?;
        let attrs = self.attrs(frame, choice);
        let condition = match choice.tag.as_str() {
            TAG_SIMULATION_TIME_CONDITION => ValueCondition::SimulationTime {
                value: attrs.double(ATTR_VALUE)?,
                rule: attrs.enumeration(ATTR_RULE, Rule::from_name, "rule")?,
            },
            TAG_STORYBOARD_ELEMENT_STATE_CONDITION => ValueCondition::StoryboardElementState {
                element_type: attrs.enumeration(
                    ATTR_STORYBOARD_ELEMENT_TYPE,
                    StoryboardElementType::from_name,
                    "storyboard element type",
                )?,
                element_ref: attrs.string(ATTR_STORYBOARD_ELEMENT_REF)?,
                state: attrs.enumeration(
                    ATTR_STATE,
                    ElementStateQuery::from_name,
                    "storyboard element state",
                )?,
            },
            _ => return Err(unsupported(choice)),
        };
        Ok(condition)
    }
}
