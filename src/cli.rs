use crate::TracePrinter;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use oscar_fmt_xml::oscar_core::{
    Diagnostic, Interpreter, Outcome, RunConfig, Time, Tracer, simulator::Sandbox,
    storyboard::ElementStatus,
};
use serde::Serialize;
use std::path::PathBuf;

/// An interpreter of OpenSCENARIO driving scenarios
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path of the scenario's .xosc file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    scenario: PathBuf,
    /// Override a global parameter of the scenario
    #[arg(short, long = "param", value_name = "NAME=VALUE", value_parser = parse_override)]
    params: Vec<(String, String)>,
    /// Simulated seconds per tick
    #[arg(short, long, default_value = "0.05")]
    step: Time,
    /// The scenario fails after this many simulated seconds
    #[arg(short, long, default_value = "60")]
    max_time: Time,
    /// Save the trace of the run as gzipped CSV
    #[arg(long, default_value = "false")]
    trace: bool,
    /// Print the final status of the storyboard as JSON
    #[arg(long, default_value = "false")]
    json: bool,
}

fn parse_override(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.trim_start_matches('$').to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected NAME=VALUE, found '{arg}'"))
}

#[derive(Serialize)]
struct Report<'a> {
    scenario: &'a str,
    outcome: &'a Outcome,
    time: Time,
    stories: Vec<ElementStatus>,
}

// Forwards to a tracer, showing the simulated time on a progress bar.
struct Progress<'a, T> {
    bar: &'a ProgressBar,
    tracer: T,
}

impl<T: Tracer> Tracer for Progress<'_, T> {
    fn init(&mut self) -> std::io::Result<()> {
        self.tracer.init()
    }

    fn trace(&mut self, time: Time, diagnostics: &[Diagnostic]) -> std::io::Result<()> {
        self.bar.set_position((time * 1000.0) as u64);
        self.bar.set_message(format!("t = {time:.2}s, {} active", diagnostics.len()));
        self.tracer.trace(time, diagnostics)
    }

    fn finalize(self, outcome: &Outcome) -> std::io::Result<()> {
        self.tracer.finalize(outcome)
    }
}

impl Cli {
    /// Loads the scenario and runs it on the sandbox simulator.
    pub fn run(&self) -> anyhow::Result<Outcome> {
        let scenario = oscar_fmt_xml::load(&self.scenario, &self.params)?;
        let name = self
            .scenario
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("???");
        println!(
            "Running scenario '{name}' with step {}s and maximum time {}s",
            self.step, self.max_time
        );
        let config = RunConfig {
            step: self.step,
            max_time: self.max_time,
        };
        let mut interpreter = Interpreter::new(scenario.storyboard, config);
        let mut sandbox = Sandbox::new();

        let style = ProgressStyle::with_template("[{elapsed_precise}] {percent:>2}% {wide_bar} {msg}")?;
        let bar = ProgressBar::new((self.max_time * 1000.0).ceil() as u64).with_style(style);
        let outcome = if self.trace {
            let tracer = TracePrinter::new(name)?;
            info!("tracing to '{}'", tracer.folder().display());
            interpreter.run(&mut sandbox, Progress { bar: &bar, tracer })?
        } else {
            interpreter.run(&mut sandbox, Progress { bar: &bar, tracer: () })?
        };
        bar.finish_and_clear();

        println!("Scenario ended at t = {:.2}s: {outcome}", sandbox.time());
        if self.json {
            let report = Report {
                scenario: name,
                outcome: &outcome,
                time: sandbox.time(),
                stories: interpreter.storyboard().status(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides() {
        assert_eq!(
            parse_override("speed=10"),
            Ok(("speed".to_string(), "10".to_string()))
        );
        assert_eq!(
            parse_override("$name=a=b"),
            Ok(("name".to_string(), "a=b".to_string()))
        );
        assert!(parse_override("=10").is_err());
        assert!(parse_override("speed").is_err());
    }

    #[test]
    fn arguments() {
        let cli = Cli::parse_from(["oscar", "scenario.xosc", "-p", "speed=3", "--param", "x=1", "--json"]);
        assert_eq!(cli.params.len(), 2);
        assert_eq!(cli.step, 0.05);
        assert_eq!(cli.max_time, 60.0);
        assert!(cli.json);
        assert!(!cli.trace);
    }
}
