use super::{LoadContext, unsupported};
use crate::parser::*;
use log::{error, trace};
use oscar_core::action::*;
use oscar_core::scope::{FrameId, Value};
use oscar_core::simulator::{
    DynamicsDimension, DynamicsShape, LaneChangeTarget, SpeedTargetValueType, TransitionDynamics,
    Visibility,
};

impl LoadContext {
    /// Builds the action held by a `GlobalAction`, `UserDefinedAction` or `PrivateAction`.
    ///
    /// `actors` are the entities private actions apply to.
    pub(super) fn action(
        &mut self,
        frame: FrameId,
        element: &Element,
        actors: &[String],
    ) -> anyhow::Result<Action> {
        let action = match element.tag.as_str() {
            TAG_GLOBAL_ACTION => self.global_action(frame, element.choice()?)?,
            TAG_USER_DEFINED_ACTION => {
                let command = element.required(TAG_CUSTOM_COMMAND_ACTION)?;
                let kind = self.attrs(frame, command).enumeration(
                    ATTR_TYPE,
                    CustomCommand::from_name,
                    "custom command",
                )?;
                Action::CustomCommand(CustomCommandAction::new(kind, &command.text))
            }
            TAG_PRIVATE_ACTION => self.private_action(frame, element.choice()?, actors)?,
            _ => return Err(unsupported(element)),
        };
        trace!(target: "builder", "action: {}", action.description());
        Ok(action)
    }

    fn global_action(&mut self, frame: FrameId, element: &Element) -> anyhow::Result<Action> {
        if element.tag != TAG_ENTITY_ACTION {
            return Err(unsupported(element));
        }
        let entity_ref = self.attrs(frame, element).string(ATTR_ENTITY_REF)?;
        let choice = element.choice()?;
        match choice.tag.as_str() {
            TAG_ADD_ENTITY_ACTION => {
                let position = self.position(frame, choice.required(TAG_POSITION)?)?;
                let action = AddEntityAction::new(&entity_ref, position, &self.entities)?;
                self.added.insert(entity_ref);
                Ok(Action::AddEntity(action))
            }
            TAG_DELETE_ENTITY_ACTION => Ok(Action::DeleteEntity(DeleteEntityAction::new(
                &entity_ref,
                &self.entities,
            )?)),
            _ => Err(unsupported(choice)),
        }
    }

    fn private_action(
        &self,
        frame: FrameId,
        element: &Element,
        actors: &[String],
    ) -> anyhow::Result<Action> {
        let action = match element.tag.as_str() {
            TAG_LONGITUDINAL_ACTION => {
                let speed = element.choice()?;
                if speed.tag != TAG_SPEED_ACTION {
                    return Err(unsupported(speed));
                }
                let dynamics = self.dynamics(frame, speed.required(TAG_SPEED_ACTION_DYNAMICS)?)?;
                let target = speed.required(TAG_SPEED_ACTION_TARGET)?.choice()?;
                let attrs = self.attrs(frame, target);
                let target = match target.tag.as_str() {
                    TAG_ABSOLUTE_TARGET_SPEED => SpeedActionTarget::Absolute(attrs.double(ATTR_VALUE)?),
                    TAG_RELATIVE_TARGET_SPEED => SpeedActionTarget::Relative {
                        entity_ref: attrs.string(ATTR_ENTITY_REF)?,
                        value_type: attrs.enumeration(
                            ATTR_SPEED_TARGET_VALUE_TYPE,
                            SpeedTargetValueType::from_name,
                            "speed target value type",
                        )?,
                        value: attrs.double(ATTR_VALUE)?,
                        continuous: attrs.boolean(ATTR_CONTINUOUS)?,
                    },
                    _ => return Err(unsupported(target)),
                };
                Action::Speed(SpeedAction::new(actors, target, dynamics, &self.entities)?)
            }
            TAG_LATERAL_ACTION => {
                let lane_change = element.choice()?;
                if lane_change.tag != TAG_LANE_CHANGE_ACTION {
                    return Err(unsupported(lane_change));
                }
                let target_lane_offset = self
                    .attrs(frame, lane_change)
                    .opt_double(ATTR_TARGET_LANE_OFFSET)?
                    .unwrap_or_default();
                let dynamics =
                    self.dynamics(frame, lane_change.required(TAG_LANE_CHANGE_ACTION_DYNAMICS)?)?;
                let target = lane_change.required(TAG_LANE_CHANGE_TARGET)?.choice()?;
                let attrs = self.attrs(frame, target);
                let target = match target.tag.as_str() {
                    TAG_ABSOLUTE_TARGET_LANE => LaneChangeTarget::Absolute(attrs.integer(ATTR_VALUE)?),
                    TAG_RELATIVE_TARGET_LANE => LaneChangeTarget::Relative {
                        entity_ref: attrs.string(ATTR_ENTITY_REF)?,
                        value: attrs.integer(ATTR_VALUE)?,
                    },
                    _ => return Err(unsupported(target)),
                };
                Action::LaneChange(LaneChangeAction::new(
                    actors,
                    target,
                    dynamics,
                    target_lane_offset,
                    &self.entities,
                )?)
            }
            TAG_TELEPORT_ACTION => Action::Teleport(TeleportAction::new(
                actors,
                self.position(frame, element.required(TAG_POSITION)?)?,
                &self.entities,
            )?),
            TAG_VISIBILITY_ACTION => {
                let attrs = self.attrs(frame, element);
                let visibility = Visibility {
                    graphics: attrs.boolean(ATTR_GRAPHICS)?,
                    traffic: attrs.boolean(ATTR_TRAFFIC)?,
                    sensors: attrs.opt_boolean(ATTR_SENSORS)?.unwrap_or(true),
                };
                Action::Visibility(VisibilityAction::new(actors, visibility, &self.entities)?)
            }
            TAG_ROUTING_ACTION => {
                let routing = element.choice()?;
                if routing.tag != TAG_ACQUIRE_POSITION_ACTION {
                    return Err(unsupported(routing));
                }
                Action::AcquirePosition(AcquirePositionAction::new(
                    actors,
                    self.position(frame, routing.required(TAG_POSITION)?)?,
                    &self.entities,
                )?)
            }
            _ => return Err(unsupported(element)),
        };
        Ok(action)
    }

    fn dynamics(&self, frame: FrameId, element: &Element) -> anyhow::Result<TransitionDynamics> {
        let attrs = self.attrs(frame, element);
        let dynamics = TransitionDynamics {
            shape: attrs.enumeration(ATTR_DYNAMICS_SHAPE, DynamicsShape::from_name, "dynamics shape")?,
            dimension: attrs.enumeration(
                ATTR_DYNAMICS_DIMENSION,
                DynamicsDimension::from_name,
                "dynamics dimension",
            )?,
            value: attrs.double(ATTR_VALUE)?,
        };
        if dynamics.value < 0.0 {
            error!(target: "builder", "negative dynamics value at line {}", element.line);
            return Err(attrs.mismatch(ATTR_VALUE, &Value::Double(dynamics.value), "non-negative double"));
        }
        Ok(dynamics)
    }
}
