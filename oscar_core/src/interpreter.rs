//! The tick loop driving a storyboard against a simulator.

use crate::Time;
use crate::simulator::{CommandError, EntityCommands, Simulator, Snapshot};
use crate::storyboard::{Storyboard, StoryboardElementState};
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Verdict of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// Not decided yet.
    #[default]
    Running,
    /// The scenario succeeded.
    Success,
    /// The scenario failed, for the given reason.
    Failure(String),
}

impl Outcome {
    /// Whether success or failure has been recorded.
    pub fn is_decided(&self) -> bool {
        !matches!(self, Outcome::Running)
    }

    /// Records a verdict, unless one has already been recorded.
    ///
    /// Returns whether the verdict was recorded.
    pub fn latch(&mut self, outcome: Outcome) -> bool {
        if self.is_decided() || !outcome.is_decided() {
            return false;
        }
        info!(target: "storyboard", "outcome: {outcome}");
        *self = outcome;
        true
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Running => write!(f, "running"),
            Outcome::Success => write!(f, "success"),
            Outcome::Failure(reason) => write!(f, "failure: {reason}"),
        }
    }
}

/// Description of an active condition or action at a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Path of the element in the storyboard, e.g. `story/act/group/maneuver/event/action`.
    pub path: String,
    /// State of the element owning the condition or action.
    pub state: StoryboardElementState,
    /// Description and measured values.
    pub description: String,
}

/// Parameters of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfig {
    /// Simulated seconds per tick.
    pub step: Time,
    /// The scenario fails when simulated time exceeds this bound.
    pub max_time: Time,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            step: 0.05,
            max_time: 60.0,
        }
    }
}

/// Errors happening while a scenario runs.
///
/// They are recoverable: the storyboard is left in a consistent state and can keep ticking.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Some commands were refused by the simulator.
    #[error(
        "{} command(s) failed at t = {time}: {}",
        .errors.len(),
        .errors.first().map(ToString::to_string).unwrap_or_default()
    )]
    Commands {
        /// Time of the tick.
        time: Time,
        /// The failures.
        errors: Vec<CommandError>,
    },
    /// The simulator failed to step.
    #[error("simulator failed to step at t = {time}")]
    Step {
        /// Time of the tick.
        time: Time,
        /// The failure.
        #[source]
        source: CommandError,
    },
    /// The tracer failed to write.
    #[error("tracer failed")]
    Tracer(#[from] std::io::Error),
    /// The step is not a positive number.
    #[error("invalid time step {0}")]
    InvalidStep(Time),
}

/// Receives the diagnostics of a run, one tick at a time.
pub trait Tracer {
    /// Called once before the first tick.
    fn init(&mut self) -> std::io::Result<()>;

    /// Called after every tick with the diagnostics of the active conditions and actions.
    fn trace(&mut self, time: Time, diagnostics: &[Diagnostic]) -> std::io::Result<()>;

    /// Called once with the final outcome.
    fn finalize(self, outcome: &Outcome) -> std::io::Result<()>;
}

/// A tracer discarding everything.
impl Tracer for () {
    fn init(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn trace(&mut self, _time: Time, _diagnostics: &[Diagnostic]) -> std::io::Result<()> {
        Ok(())
    }

    fn finalize(self, _outcome: &Outcome) -> std::io::Result<()> {
        Ok(())
    }
}

/// Interprets a storyboard, one tick at a time.
#[derive(Debug, Clone)]
pub struct Interpreter {
    storyboard: Storyboard,
    config: RunConfig,
}

impl Interpreter {
    /// Creates an interpreter for the storyboard.
    pub fn new(storyboard: Storyboard, config: RunConfig) -> Self {
        Self { storyboard, config }
    }

    /// The interpreted storyboard.
    pub fn storyboard(&self) -> &Storyboard {
        &self.storyboard
    }

    /// The run parameters.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The outcome so far.
    pub fn outcome(&self) -> &Outcome {
        self.storyboard.outcome()
    }

    /// Processes one tick, and returns the outcome so far.
    ///
    /// Exceeding the maximum simulated time is a failure.
    pub fn tick(
        &mut self,
        snapshot: &Snapshot,
        commands: &mut dyn EntityCommands,
    ) -> Result<Outcome, RuntimeError> {
        let errors = self.storyboard.tick(snapshot, commands);
        if snapshot.time > self.config.max_time {
            self.storyboard.latch(Outcome::Failure(format!(
                "maximum simulation time {}s exceeded",
                self.config.max_time
            )));
        }
        if errors.is_empty() {
            Ok(self.outcome().clone())
        } else {
            Err(RuntimeError::Commands {
                time: snapshot.time,
                errors,
            })
        }
    }

    /// Runs the scenario on the simulator until an outcome is decided.
    pub fn run<S, T>(&mut self, simulator: &mut S, mut tracer: T) -> Result<Outcome, RuntimeError>
    where
        S: Simulator,
        T: Tracer,
    {
        if self.config.step.is_nan() || self.config.step <= 0.0 {
            return Err(RuntimeError::InvalidStep(self.config.step));
        }
        tracer.init()?;
        let outcome = loop {
            let snapshot = simulator.snapshot();
            let outcome = match self.tick(&snapshot, simulator) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(target: "storyboard", "{err}");
                    self.outcome().clone()
                }
            };
            tracer.trace(snapshot.time, &self.storyboard.diagnostics())?;
            if outcome.is_decided() {
                break outcome;
            }
            simulator
                .step(self.config.step)
                .map_err(|source| RuntimeError::Step {
                    time: snapshot.time,
                    source,
                })?;
        };
        info!(target: "storyboard", "scenario ended: {outcome}");
        tracer.finalize(&outcome)?;
        Ok(outcome)
    }
}
