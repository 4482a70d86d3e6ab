use super::{LoadContext, unsupported};
use crate::catalog::CatalogKind;
use crate::parser::*;
use anyhow::Context;
use log::{info, warn};
use oscar_core::entities::{ObjectType, ScenarioObject};
use oscar_core::math::{BoundingBox, Dimensions, Orientation, Point, Pose};
use oscar_core::position::{LanePosition, Position};
use oscar_core::scope::{FrameId, Scope};

impl LoadContext {
    pub(super) fn entities(&mut self, element: &Element) -> anyhow::Result<()> {
        for child in &element.children {
            match child.tag.as_str() {
                TAG_SCENARIO_OBJECT => {
                    let name = self.attrs(Scope::GLOBAL, child).string(ATTR_NAME)?;
                    let definition = child
                        .children
                        .iter()
                        .find(|c| c.tag != TAG_OBJECT_CONTROLLER)
                        .ok_or_else(|| DocumentError::MissingElement {
                            element: TAG_SCENARIO_OBJECT.to_owned(),
                            child: TAG_VEHICLE.to_owned(),
                        })?;
                    let object = self
                        .object(Scope::GLOBAL, &name, definition)
                        .with_context(|| format!("failed to build object '{name}' at line {}", child.line))?;
                    info!(target: "builder", "object '{name}': {:?}", object.object_type);
                    self.entities.add_object(object)?;
                }
                TAG_ENTITY_SELECTION => {
                    let attrs = self.attrs(Scope::GLOBAL, child);
                    let name = attrs.string(ATTR_NAME)?;
                    let members = child
                        .required(TAG_MEMBERS)?
                        .children
                        .iter()
                        .map(|member| match member.tag.as_str() {
                            TAG_ENTITY_REF => self.attrs(Scope::GLOBAL, member).string(ATTR_ENTITY_REF),
                            _ => Err(unsupported(member)),
                        })
                        .collect::<anyhow::Result<Vec<_>>>()?;
                    info!(target: "builder", "selection '{name}': {members:?}");
                    self.entities.add_selection(&name, members)?;
                }
                _ => return Err(unsupported(child)),
            }
        }
        Ok(())
    }

    fn object(
        &mut self,
        frame: FrameId,
        name: &str,
        definition: &Element,
    ) -> anyhow::Result<ScenarioObject> {
        if definition.tag == TAG_CATALOG_REFERENCE {
            let (entry, frame) = self.instantiate(frame, definition, CatalogKind::ENTITIES)?;
            self.object_definition(frame, name, &entry)
        } else {
            let frame = self.open_frame(frame, name, definition)?;
            self.object_definition(frame, name, definition)
        }
    }

    fn object_definition(
        &self,
        frame: FrameId,
        name: &str,
        definition: &Element,
    ) -> anyhow::Result<ScenarioObject> {
        let object_type = match definition.tag.as_str() {
            TAG_VEHICLE => ObjectType::Vehicle,
            TAG_PEDESTRIAN => ObjectType::Pedestrian,
            TAG_MISC_OBJECT => ObjectType::MiscObject,
            _ => return Err(unsupported(definition)),
        };
        let bounding_box = match definition.child(TAG_BOUNDING_BOX) {
            Some(element) => self.bounding_box(frame, element)?,
            None => {
                warn!(target: "builder", "object '{name}' has no bounding box, using default");
                BoundingBox::default()
            }
        };
        Ok(ScenarioObject {
            name: name.to_owned(),
            object_type,
            bounding_box,
        })
    }

    fn bounding_box(&self, frame: FrameId, element: &Element) -> anyhow::Result<BoundingBox> {
        let center = element.required(TAG_CENTER)?;
        let attrs = self.attrs(frame, center);
        let center = Point::new(
            attrs.double(ATTR_X)?,
            attrs.double(ATTR_Y)?,
            attrs.double(ATTR_Z)?,
        );
        let dimensions = element.required(TAG_DIMENSIONS)?;
        let attrs = self.attrs(frame, dimensions);
        Ok(BoundingBox {
            center,
            dimensions: Dimensions {
                width: attrs.double(ATTR_WIDTH)?,
                length: attrs.double(ATTR_LENGTH)?,
                height: attrs.double(ATTR_HEIGHT)?,
            },
        })
    }

    /// Builds the position held by a `Position` element.
    pub(super) fn position(&self, frame: FrameId, element: &Element) -> anyhow::Result<Position> {
        let choice = element.choice()?;
        let attrs = self.attrs(frame, choice);
        let position = match choice.tag.as_str() {
            TAG_WORLD_POSITION => Position::World(Pose {
                position: Point::new(
                    attrs.double(ATTR_X)?,
                    attrs.double(ATTR_Y)?,
                    attrs.opt_double(ATTR_Z)?.unwrap_or_default(),
                ),
                orientation: Orientation {
                    h: attrs.opt_double(ATTR_H)?.unwrap_or_default(),
                    p: attrs.opt_double(ATTR_P)?.unwrap_or_default(),
                    r: attrs.opt_double(ATTR_R)?.unwrap_or_default(),
                },
            }),
            TAG_RELATIVE_WORLD_POSITION | TAG_RELATIVE_OBJECT_POSITION => {
                let entity_ref = attrs.string(ATTR_ENTITY_REF)?;
                self.check_entity(&entity_ref)?;
                let offset = Point::new(
                    attrs.double(ATTR_DX)?,
                    attrs.double(ATTR_DY)?,
                    attrs.opt_double(ATTR_DZ)?.unwrap_or_default(),
                );
                if choice.tag == TAG_RELATIVE_WORLD_POSITION {
                    Position::RelativeWorld { entity_ref, offset }
                } else {
                    Position::RelativeObject { entity_ref, offset }
                }
            }
            TAG_LANE_POSITION => Position::Lane(LanePosition {
                road_id: attrs.string(ATTR_ROAD_ID)?,
                lane_id: attrs.integer(ATTR_LANE_ID)?,
                s: attrs.double(ATTR_S)?,
                offset: attrs.opt_double(ATTR_OFFSET)?.unwrap_or_default(),
            }),
            _ => return Err(unsupported(choice)),
        };
        Ok(position)
    }
}
