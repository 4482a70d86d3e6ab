//! Actions performed on the simulated entities.
//!
//! Every action goes through the same contract:
//! [`Action::start`] captures the per-actor baseline and sends the commands,
//! [`Action::run`] does per-tick bookkeeping,
//! and [`Action::accomplished`] tells whether every actor has reached its target.
//! Most actions are instantaneous commands, accomplished as soon as they are sent.

mod global;
mod private;

pub use global::*;
pub use private::*;

use crate::entities::{Entities, SemanticError};
use crate::simulator::{EntityStatus, Snapshot};
use crate::storyboard::{Context, Effects};
use log::trace;
use std::fmt;

/// The actors of a private action, with their accomplishment.
#[derive(Debug, Clone, PartialEq)]
pub struct Actors {
    names: Vec<String>,
    accomplished: Vec<bool>,
}

impl Actors {
    /// Expands the actor references into object names.
    pub fn new(
        action: &'static str,
        refs: &[String],
        entities: &Entities,
    ) -> Result<Self, SemanticError> {
        if refs.is_empty() {
            return Err(SemanticError::NoActors(action));
        }
        let mut names = Vec::new();
        for actor in refs {
            for object in entities.expand(actor)? {
                if !names.contains(&object) {
                    names.push(object);
                }
            }
        }
        let accomplished = vec![false; names.len()];
        Ok(Self {
            names,
            accomplished,
        })
    }

    /// Like [`Actors::new`], also checking the actors are all vehicles or all pedestrians.
    pub fn moving(
        action: &'static str,
        refs: &[String],
        entities: &Entities,
    ) -> Result<Self, SemanticError> {
        entities.check_motion_actors(action, refs)?;
        Self::new(action, refs, entities)
    }

    /// Names of the actor objects.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn reset(&mut self) {
        self.accomplished.fill(false);
    }

    // Latches the actors which have reached their target, and returns whether all have.
    // Actors that do not exist are not accomplished.
    fn update<F>(&mut self, snapshot: &Snapshot, mut reached: F) -> bool
    where
        F: FnMut(&EntityStatus) -> bool,
    {
        for (name, accomplished) in self.names.iter().zip(self.accomplished.iter_mut()) {
            if !*accomplished {
                *accomplished = snapshot.status(name).is_some_and(&mut reached);
            }
        }
        self.accomplished.iter().all(|b| *b)
    }
}

impl fmt::Display for Actors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actors = self
            .names
            .iter()
            .zip(&self.accomplished)
            .map(|(name, done)| if *done { format!("{name} (done)") } else { name.clone() })
            .collect::<Vec<_>>();
        write!(f, "[{}]", actors.join(", "))
    }
}

/// The closed set of actions.
#[derive(Debug, Clone)]
pub enum Action {
    /// `SpeedAction`
    Speed(SpeedAction),
    /// `LaneChangeAction`
    LaneChange(LaneChangeAction),
    /// `TeleportAction`
    Teleport(TeleportAction),
    /// `VisibilityAction`
    Visibility(VisibilityAction),
    /// `AcquirePositionAction`
    AcquirePosition(AcquirePositionAction),
    /// `AddEntityAction`
    AddEntity(AddEntityAction),
    /// `DeleteEntityAction`
    DeleteEntity(DeleteEntityAction),
    /// `CustomCommandAction`
    CustomCommand(CustomCommandAction),
}

impl Action {
    /// Captures the baseline of the actors and sends the commands.
    pub fn start(&mut self, ctx: &Context, fx: &mut Effects) {
        match self {
            Action::Speed(action) => action.start(ctx, fx),
            Action::LaneChange(action) => action.start(ctx, fx),
            Action::Teleport(action) => action.start(ctx, fx),
            Action::Visibility(action) => action.start(fx),
            Action::AcquirePosition(action) => action.start(ctx, fx),
            Action::AddEntity(action) => action.start(ctx, fx),
            Action::DeleteEntity(action) => action.start(fx),
            Action::CustomCommand(action) => action.start(fx),
        }
    }

    /// Per-tick bookkeeping of a running action.
    ///
    /// Commands are fire-and-forget, so there is nothing to do but tracing.
    pub fn run(&mut self, ctx: &Context, _fx: &mut Effects) {
        trace!(target: "storyboard", "at {}: {}", ctx.snapshot.time, self.description());
    }

    /// Whether every actor has reached its target.
    pub fn accomplished(&mut self, ctx: &Context) -> bool {
        match self {
            Action::Speed(action) => action.accomplished(ctx),
            Action::LaneChange(action) => action.accomplished(ctx),
            Action::AcquirePosition(action) => action.accomplished(ctx),
            Action::Teleport(_)
            | Action::Visibility(_)
            | Action::AddEntity(_)
            | Action::DeleteEntity(_)
            | Action::CustomCommand(_) => true,
        }
    }

    /// Name of the entity added by the action, if it is an `AddEntityAction`.
    pub fn added_entity(&self) -> Option<&str> {
        match self {
            Action::AddEntity(action) => Some(&action.object().name),
            _ => None,
        }
    }

    /// Human-readable description of the action and of the progress of its actors.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Speed(action) => fmt::Display::fmt(action, f),
            Action::LaneChange(action) => fmt::Display::fmt(action, f),
            Action::Teleport(action) => fmt::Display::fmt(action, f),
            Action::Visibility(action) => fmt::Display::fmt(action, f),
            Action::AcquirePosition(action) => fmt::Display::fmt(action, f),
            Action::AddEntity(action) => fmt::Display::fmt(action, f),
            Action::DeleteEntity(action) => fmt::Display::fmt(action, f),
            Action::CustomCommand(action) => fmt::Display::fmt(action, f),
        }
    }
}
