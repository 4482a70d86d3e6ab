use super::{LoadContext, unsupported};
use crate::catalog::CatalogKind;
use crate::parser::*;
use anyhow::Context;
use log::{info, trace, warn};
use oscar_core::action::Action;
use oscar_core::scope::{FrameId, Scope};
use oscar_core::storyboard::{
    Act, Event, Init, Maneuver, ManeuverGroup, Priority, Story, Storyboard, StoryboardBehavior,
    StoryboardElement,
};
use oscar_core::trigger::Trigger;

impl LoadContext {
    pub(super) fn storyboard(&mut self, element: &Element) -> anyhow::Result<Storyboard> {
        for child in &element.children {
            if ![TAG_INIT, TAG_STORY, TAG_STOP_TRIGGER].contains(&child.tag.as_str()) {
                return Err(unsupported(child));
            }
        }
        let actions = self
            .init(element.required(TAG_INIT)?)
            .context("failed to build init")?;
        let spawn = self
            .entities
            .objects()
            .filter(|object| !self.added.contains(&object.name))
            .cloned()
            .collect::<Vec<_>>();
        info!(target: "builder", "init spawns {} objects and runs {} actions", spawn.len(), actions.len());

        let mut stories = Vec::new();
        for story in element.children_named(TAG_STORY) {
            let story = self.story(story)?;
            stories.push(story);
        }
        let stop_trigger = match element.child(TAG_STOP_TRIGGER) {
            Some(trigger) => self.trigger(Scope::GLOBAL, trigger)?,
            None => {
                warn!(target: "builder", "storyboard has no stop trigger");
                Trigger::default()
            }
        };
        Ok(Storyboard::new(Init::new(spawn, actions), stories, stop_trigger))
    }

    fn init(&mut self, element: &Element) -> anyhow::Result<Vec<StoryboardElement<Action>>> {
        let mut actions = Vec::new();
        let Some(list) = element.child(TAG_ACTIONS) else {
            return Ok(actions);
        };
        for child in &list.children {
            match child.tag.as_str() {
                TAG_GLOBAL_ACTION | TAG_USER_DEFINED_ACTION => {
                    let action = self
                        .action(Scope::GLOBAL, child, &[])
                        .with_context(|| format!("failed to build init action at line {}", child.line))?;
                    actions.push(StoryboardElement::new(&format!("init[{}]", actions.len()), action));
                }
                TAG_PRIVATE => {
                    let entity_ref = self.attrs(Scope::GLOBAL, child).string(ATTR_ENTITY_REF)?;
                    self.check_entity(&entity_ref)?;
                    let actors = [entity_ref];
                    for private in &child.children {
                        if private.tag != TAG_PRIVATE_ACTION {
                            return Err(unsupported(private));
                        }
                        let action = self
                            .action(Scope::GLOBAL, private, &actors)
                            .with_context(|| {
                                format!("failed to build init action of '{}' at line {}", actors[0], private.line)
                            })?;
                        let name = format!("init[{}]", actions.len());
                        actions.push(StoryboardElement::new(&name, action));
                    }
                }
                _ => return Err(unsupported(child)),
            }
        }
        Ok(actions)
    }

    fn story(&mut self, element: &Element) -> anyhow::Result<StoryboardElement<Story>> {
        let name = self.attrs(Scope::GLOBAL, element).string(ATTR_NAME)?;
        let frame = self.open_frame(Scope::GLOBAL, &name, element)?;
        let mut acts = Vec::new();
        for act in element.children_named(TAG_ACT) {
            let act = self
                .act(frame, act)
                .with_context(|| format!("failed to build story '{name}'"))?;
            acts.push(act);
        }
        if acts.is_empty() {
            warn!(target: "builder", "story '{name}' has no acts");
        }
        trace!(target: "builder", "story '{name}' with {} acts", acts.len());
        Ok(StoryboardElement::new(&name, Story::new(acts)))
    }

    fn act(&mut self, frame: FrameId, element: &Element) -> anyhow::Result<StoryboardElement<Act>> {
        let name = self.attrs(frame, element).string(ATTR_NAME)?;
        let mut groups = Vec::new();
        for group in element.children_named(TAG_MANEUVER_GROUP) {
            let group = self
                .maneuver_group(frame, group)
                .with_context(|| format!("failed to build act '{name}' at line {}", element.line))?;
            groups.push(group);
        }
        self.with_triggers(frame, element, StoryboardElement::new(&name, Act::new(groups)))
    }

    fn maneuver_group(
        &mut self,
        frame: FrameId,
        element: &Element,
    ) -> anyhow::Result<StoryboardElement<ManeuverGroup>> {
        let attrs = self.attrs(frame, element);
        let name = attrs.string(ATTR_NAME)?;
        let count = attrs.opt_unsigned(ATTR_MAXIMUM_EXECUTION_COUNT)?.unwrap_or(1);
        let actors_element = element.required(TAG_ACTORS)?;
        if self
            .attrs(frame, actors_element)
            .opt_boolean(ATTR_SELECT_TRIGGERING_ENTITIES)?
            .unwrap_or_default()
        {
            warn!(target: "builder", "maneuver group '{name}': selectTriggeringEntities is not supported");
        }
        let actors = actors_element
            .children_named(TAG_ENTITY_REF)
            .map(|actor| -> anyhow::Result<String> {
                let actor = self.attrs(frame, actor).string(ATTR_ENTITY_REF)?;
                self.check_entity(&actor)?;
                Ok(actor)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut maneuvers = Vec::new();
        for child in &element.children {
            let maneuver = match child.tag.as_str() {
                TAG_ACTORS => continue,
                TAG_MANEUVER => {
                    let maneuver_name = self.attrs(frame, child).string(ATTR_NAME)?;
                    let maneuver_frame = self.open_frame(frame, &maneuver_name, child)?;
                    self.maneuver(maneuver_frame, child, &actors)?
                }
                TAG_CATALOG_REFERENCE => {
                    let (entry, entry_frame) =
                        self.instantiate(frame, child, CatalogKind::MANEUVERS)?;
                    if entry.tag != TAG_MANEUVER {
                        return Err(unsupported(&entry));
                    }
                    self.maneuver(entry_frame, &entry, &actors)?
                }
                _ => return Err(unsupported(child)),
            };
            maneuvers.push(maneuver);
        }
        trace!(target: "builder", "maneuver group '{name}' with actors {actors:?}");
        Ok(StoryboardElement::new(&name, ManeuverGroup::new(actors, maneuvers))
            .with_maximum_execution_count(count as usize))
    }

    fn maneuver(
        &mut self,
        frame: FrameId,
        element: &Element,
        actors: &[String],
    ) -> anyhow::Result<StoryboardElement<Maneuver>> {
        let name = self.attrs(frame, element).string(ATTR_NAME)?;
        let mut events = Vec::new();
        for event in element.children_named(TAG_EVENT) {
            let event = self
                .event(frame, event, actors)
                .with_context(|| format!("failed to build maneuver '{name}' at line {}", element.line))?;
            events.push(event);
        }
        Ok(StoryboardElement::new(&name, Maneuver::new(events)))
    }

    fn event(
        &mut self,
        frame: FrameId,
        element: &Element,
        actors: &[String],
    ) -> anyhow::Result<StoryboardElement<Event>> {
        let attrs = self.attrs(frame, element);
        let name = attrs.string(ATTR_NAME)?;
        let priority = attrs
            .opt_enumeration(ATTR_PRIORITY, Priority::from_name, "priority")?
            .unwrap_or_default();
        let count = attrs.opt_unsigned(ATTR_MAXIMUM_EXECUTION_COUNT)?.unwrap_or(1);
        let mut actions = Vec::new();
        for action in element.children_named(TAG_ACTION) {
            let action_name = self.attrs(frame, action).string(ATTR_NAME)?;
            let inner = self
                .action(frame, action.choice()?, actors)
                .with_context(|| format!("failed to build action '{action_name}' at line {}", action.line))?;
            actions.push(StoryboardElement::new(&action_name, inner));
        }
        let event = StoryboardElement::new(&name, Event::new(priority, actions))
            .with_maximum_execution_count(count as usize);
        self.with_triggers(frame, element, event)
    }

    fn with_triggers<T>(
        &self,
        frame: FrameId,
        element: &Element,
        mut storyboard_element: StoryboardElement<T>,
    ) -> anyhow::Result<StoryboardElement<T>>
    where
        T: StoryboardBehavior,
    {
        if let Some(trigger) = element.child(TAG_START_TRIGGER) {
            storyboard_element = storyboard_element.with_start_trigger(self.trigger(frame, trigger)?);
        }
        if let Some(trigger) = element.child(TAG_STOP_TRIGGER) {
            storyboard_element = storyboard_element.with_stop_trigger(self.trigger(frame, trigger)?);
        }
        Ok(storyboard_element)
    }
}
