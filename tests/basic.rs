use anyhow::anyhow;
use oscar::TracePrinter;
use oscar::oscar_fmt_xml::oscar_core::{
    Interpreter, Outcome, RunConfig, simulator::Sandbox, storyboard::StoryboardElementState,
};
use oscar::oscar_fmt_xml::{self, DocumentError, Scenario};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const MAX_TIME: f64 = 30.0;

fn load(file: &str, overrides: &[(&str, &str)]) -> anyhow::Result<Scenario> {
    let path = PathBuf::from_str("./tests/scenarios")?.join(file);
    let overrides = overrides
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect::<Vec<_>>();
    oscar_fmt_xml::load(&path, &overrides)
}

fn run(scenario: Scenario) -> anyhow::Result<(Outcome, Sandbox)> {
    let config = RunConfig {
        step: 0.05,
        max_time: MAX_TIME,
    };
    let mut interpreter = Interpreter::new(scenario.storyboard, config);
    let mut sandbox = Sandbox::new();
    let outcome = interpreter.run(&mut sandbox, ())?;
    Ok((outcome, sandbox))
}

#[test]
fn accelerate() -> anyhow::Result<()> {
    let scenario = load("accelerate.xosc", &[])?;
    let ego = scenario
        .entities
        .object("ego")
        .ok_or_else(|| anyhow!("ego not declared"))?;
    assert_eq!(ego.bounding_box.dimensions.length, 5.0);
    let (outcome, sandbox) = run(scenario)?;
    assert_eq!(outcome, Outcome::Success);
    let ego = sandbox.status("ego").ok_or_else(|| anyhow!("ego not spawned"))?;
    assert!((ego.linear_velocity - 20.0).abs() < 1e-6);
    // 10 m/s to 20 m/s at 5 m/s².
    assert!(sandbox.time() > 2.0 && sandbox.time() < 2.5, "t = {}", sandbox.time());
    Ok(())
}

#[test]
fn accelerate_override() -> anyhow::Result<()> {
    let scenario = load("accelerate.xosc", &[("target_speed", "30")])?;
    let (outcome, sandbox) = run(scenario)?;
    assert_eq!(outcome, Outcome::Success);
    let ego = sandbox.status("ego").ok_or_else(|| anyhow!("ego not spawned"))?;
    assert!((ego.linear_velocity - 30.0).abs() < 1e-6);
    Ok(())
}

#[test]
fn rear_end_collision() -> anyhow::Result<()> {
    let (outcome, sandbox) = run(load("rear_end.xosc", &[])?)?;
    assert_eq!(outcome, Outcome::Failure("rear-end collision".to_string()));
    assert!(sandbox.time() < 10.0);
    Ok(())
}

#[test]
fn rear_end_avoided() -> anyhow::Result<()> {
    let (outcome, sandbox) = run(load("rear_end.xosc", &[("lead_speed", "10")])?)?;
    assert_eq!(outcome, Outcome::Success);
    assert!(sandbox.time() > 10.0);
    Ok(())
}

#[test]
fn lane_change() -> anyhow::Result<()> {
    let scenario = load("lane_change.xosc", &[])?;
    let config = RunConfig {
        step: 0.05,
        max_time: MAX_TIME,
    };
    let mut interpreter = Interpreter::new(scenario.storyboard, config);
    let mut sandbox = Sandbox::new();
    let outcome = interpreter.run(&mut sandbox, ())?;
    assert_eq!(outcome, Outcome::Success);
    let lane_pose = sandbox
        .status("ego")
        .and_then(|ego| ego.lane_pose)
        .ok_or_else(|| anyhow!("ego is not on a lane"))?;
    assert_eq!(lane_pose.lane_id, -2);
    let status = interpreter.storyboard().status();
    assert_eq!(status[0].name, "lane_change_story");
    assert_eq!(status[0].state, StoryboardElementState::Complete);
    Ok(())
}

#[test]
fn missing_catalog_entry() -> anyhow::Result<()> {
    let text = std::fs::read_to_string("./tests/scenarios/rear_end.xosc")?
        .replace(r#"entryName="truck""#, r#"entryName="bus""#);
    let err = match oscar_fmt_xml::load_str(&text, Path::new("./tests/scenarios"), &[]) {
        Ok(_) => return Err(anyhow!("bus is not in the catalog")),
        Err(err) => err,
    };
    assert!(err.chain().any(|cause| matches!(
        cause.downcast_ref::<DocumentError>(),
        Some(DocumentError::CatalogEntryNotFound { entry, .. }) if entry == "bus"
    )));
    Ok(())
}

#[test]
fn trace_printer() -> anyhow::Result<()> {
    let dir = std::env::temp_dir().join(format!("oscar_trace_{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let printer = TracePrinter::in_dir(&dir, "rear_end")?;
    let folder = printer.folder().to_owned();
    let scenario = load("rear_end.xosc", &[])?;
    let mut interpreter = Interpreter::new(scenario.storyboard, RunConfig::default());
    let outcome = interpreter.run(&mut Sandbox::new(), printer)?;
    assert!(matches!(outcome, Outcome::Failure(_)));

    let trace = folder.join("failures").join("rear_end.csv.gz");
    let mut text = String::new();
    flate2::read::GzDecoder::new(std::fs::File::open(&trace)?).read_to_string(&mut text)?;
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    assert_eq!(
        reader.headers()?.iter().collect::<Vec<_>>(),
        ["Time", "Element", "State", "Description"]
    );
    let records = reader.records().collect::<Result<Vec<_>, _>>()?;
    assert!(records.iter().any(|record| &record[1] == "timeout"));
    assert!(
        records
            .iter()
            .any(|record| &record[1] == "watch/watch_act/monitor/checks/crash/collision")
    );
    assert!(!folder.join(".temp").join("rear_end.csv.gz").exists());

    // A second printer gets its own folder.
    let other = TracePrinter::in_dir(&dir, "rear_end")?;
    assert_ne!(other.folder(), folder);
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
