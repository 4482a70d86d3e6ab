//! Loader of OpenSCENARIO (`.xosc`) documents for the OSCAR interpreter.
//!
//! Loading goes through two stages:
//! the [`parser`] reads the document into a tree of elements checked against the known vocabulary,
//! then the builder resolves parameters, expressions and catalog references
//! and instantiates the [`oscar_core`] storyboard.

mod builder;
mod catalog;
pub mod parser;

pub use builder::FileHeader;
pub use catalog::CatalogKind;
pub use oscar_core;
pub use parser::DocumentError;

use anyhow::Context;
use log::info;
use oscar_core::Entities;
use oscar_core::scope::Scope;
use oscar_core::storyboard::Storyboard;
use std::path::Path;

/// A scenario ready to be interpreted.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Header of the document.
    pub header: FileHeader,
    /// Declared entities.
    pub entities: Entities,
    /// Parameters, as resolved while loading.
    pub scope: Scope,
    /// The storyboard.
    pub storyboard: Storyboard,
}

/// Loads the scenario at `path`.
///
/// Catalog directories are relative to the directory of the document.
/// `overrides` are `(name, value)` pairs replacing the defaults of global parameters.
pub fn load(path: &Path, overrides: &[(String, String)]) -> anyhow::Result<Scenario> {
    info!(target: "parser", "loading '{}'", path.display());
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read file '{}'", path.display()))?;
    let base_dir = path.parent().unwrap_or(Path::new("."));
    load_str(&text, base_dir, overrides).with_context(|| format!("failed to load '{}'", path.display()))
}

/// Loads a scenario from the text of a document.
pub fn load_str(
    text: &str,
    base_dir: &Path,
    overrides: &[(String, String)],
) -> anyhow::Result<Scenario> {
    let root = parser::parse(text)?;
    builder::build(&root, base_dir, overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oscar_core::action::Action;
    use oscar_core::scope::{ScopeError, Value};
    use oscar_core::simulator::Sandbox;
    use oscar_core::{Interpreter, ObjectType, Outcome, RunConfig, SemanticError};

    fn document_error(err: &anyhow::Error) -> Option<&DocumentError> {
        err.chain().find_map(|cause| cause.downcast_ref::<DocumentError>())
    }

    fn scenario(parameters: &str, entities: &str, storyboard: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<OpenSCENARIO>
  <FileHeader revMajor="1" revMinor="0" date="2024-01-01T00:00:00" description="test" author="oscar"/>
  <ParameterDeclarations>{parameters}</ParameterDeclarations>
  <Entities>{entities}</Entities>
  <Storyboard>{storyboard}</Storyboard>
</OpenSCENARIO>"#
        )
    }

    const EGO: &str = r#"
    <ScenarioObject name="ego">
      <Vehicle name="car" vehicleCategory="car">
        <BoundingBox>
          <Center x="1.5" y="0" z="0.9"/>
          <Dimensions width="2" length="5" height="1.8"/>
        </BoundingBox>
      </Vehicle>
    </ScenarioObject>"#;

    const EGO_SPEED: &str = r#"
    <Init><Actions>
      <Private entityRef="ego">
        <PrivateAction><TeleportAction><Position><WorldPosition x="0" y="0"/></Position></TeleportAction></PrivateAction>
        <PrivateAction><LongitudinalAction><SpeedAction>
          <SpeedActionDynamics dynamicsShape="step" value="0" dynamicsDimension="time"/>
          <SpeedActionTarget><AbsoluteTargetSpeed value="$speed"/></SpeedActionTarget>
        </SpeedAction></LongitudinalAction></PrivateAction>
      </Private>
    </Actions></Init>"#;

    #[test]
    fn parameters_and_expressions() {
        let text = scenario(
            r#"<ParameterDeclaration name="speed" parameterType="double" value="10"/>
               <ParameterDeclaration name="lanes" parameterType="integer" value="${2 * 3 - 1}"/>
               <ParameterDeclaration name="fast" parameterType="boolean" value="${$speed > 5 and not false}"/>"#,
            EGO,
            EGO_SPEED,
        );
        let scenario = load_str(&text, Path::new("."), &[]).expect("load");
        assert_eq!(scenario.header.author, "oscar");
        assert_eq!(
            scenario.scope.resolve(Scope::GLOBAL, "$speed").expect("speed"),
            &Value::Double(10.0)
        );
        assert_eq!(
            scenario.scope.resolve(Scope::GLOBAL, "lanes").expect("lanes"),
            &Value::Integer(5)
        );
        assert_eq!(
            scenario.scope.resolve(Scope::GLOBAL, "fast").expect("fast"),
            &Value::Boolean(true)
        );
        let init = scenario.storyboard.init();
        assert_eq!(init.spawned().len(), 1);
        assert_eq!(init.actions().len(), 2);
        assert!(matches!(init.actions()[1].inner(), Action::Speed(_)));
        assert_eq!(
            scenario.entities.object("ego").map(|o| o.object_type),
            Some(ObjectType::Vehicle)
        );
    }

    #[test]
    fn overrides() {
        let text = scenario(
            r#"<ParameterDeclaration name="speed" parameterType="double" value="10"/>"#,
            EGO,
            EGO_SPEED,
        );
        let overrides = [("speed".to_string(), "3.5".to_string())];
        let scenario = load_str(&text, Path::new("."), &overrides).expect("load");
        assert_eq!(
            scenario.scope.resolve(Scope::GLOBAL, "speed").expect("speed"),
            &Value::Double(3.5)
        );

        let overrides = [("unknown".to_string(), "1".to_string())];
        let err = load_str(&text, Path::new("."), &overrides).expect_err("unknown parameter");
        assert!(matches!(
            err.downcast_ref::<ScopeError>(),
            Some(ScopeError::UndefinedParameter(name)) if name == "unknown"
        ));

        let overrides = [("speed".to_string(), "fast".to_string())];
        let err = load_str(&text, Path::new("."), &overrides).expect_err("not a double");
        assert!(matches!(
            document_error(&err),
            Some(DocumentError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn type_mismatch() {
        let text = scenario(
            r#"<ParameterDeclaration name="speed" parameterType="string" value="slow"/>"#,
            EGO,
            EGO_SPEED,
        );
        let err = load_str(&text, Path::new("."), &[]).expect_err("string speed");
        assert!(matches!(
            document_error(&err),
            Some(DocumentError::TypeMismatch { attribute, .. }) if attribute == "value"
        ));
    }

    #[test]
    fn undefined_parameter() {
        let text = scenario("", EGO, EGO_SPEED);
        let err = load_str(&text, Path::new("."), &[]).expect_err("no speed");
        assert!(err.chain().any(|cause| matches!(
            cause.downcast_ref::<ScopeError>(),
            Some(ScopeError::UndefinedParameter(_))
        )));
    }

    #[test]
    fn missing_attribute() {
        let text = scenario(
            "",
            r#"<ScenarioObject name="ego"><Vehicle name="car"><BoundingBox>
                 <Center x="0" y="0"/><Dimensions width="2" length="5" height="1.8"/>
               </BoundingBox></Vehicle></ScenarioObject>"#,
            "<Init/>",
        );
        let err = load_str(&text, Path::new("."), &[]).expect_err("no z");
        assert_eq!(
            document_error(&err),
            Some(&DocumentError::MissingAttribute {
                element: "Center".to_string(),
                attribute: "z".to_string(),
            })
        );
    }

    #[test]
    fn unsupported_condition() {
        let text = scenario(
            "",
            EGO,
            r#"<Init/>
            <StopTrigger><ConditionGroup><Condition name="end" delay="0" conditionEdge="rising">
              <ByValueCondition><ParameterCondition parameterRef="x" value="1" rule="equalTo"/></ByValueCondition>
            </Condition></ConditionGroup></StopTrigger>"#,
        );
        let err = load_str(&text, Path::new("."), &[]).expect_err("unsupported");
        assert_eq!(
            document_error(&err),
            Some(&DocumentError::UnsupportedElement("ParameterCondition".to_string()))
        );
    }

    #[test]
    fn unknown_actor() {
        let text = scenario(
            r#"<ParameterDeclaration name="speed" parameterType="double" value="10"/>"#,
            EGO,
            r#"<Init/>
            <Story name="story"><Act name="act">
              <ManeuverGroup name="group" maximumExecutionCount="1">
                <Actors selectTriggeringEntities="false"><EntityRef entityRef="ghost"/></Actors>
              </ManeuverGroup>
              <StartTrigger/>
            </Act></Story>"#,
        );
        let err = load_str(&text, Path::new("."), &[]).expect_err("unknown actor");
        assert!(err.chain().any(|cause| matches!(
            cause.downcast_ref::<SemanticError>(),
            Some(SemanticError::UnknownEntity(name)) if name == "ghost"
        )));
    }

    #[test]
    fn mixed_actors() {
        let entities = format!(
            r#"{EGO}
            <ScenarioObject name="walker">
              <Pedestrian name="walker" model="p" mass="80" pedestrianCategory="pedestrian"/>
            </ScenarioObject>
            <EntitySelection name="everyone"><Members>
              <EntityRef entityRef="ego"/><EntityRef entityRef="walker"/>
            </Members></EntitySelection>"#
        );
        let text = scenario(
            "",
            &entities,
            r#"<Init><Actions><Private entityRef="everyone">
              <PrivateAction><LongitudinalAction><SpeedAction>
                <SpeedActionDynamics dynamicsShape="step" value="0" dynamicsDimension="time"/>
                <SpeedActionTarget><AbsoluteTargetSpeed value="1"/></SpeedActionTarget>
              </SpeedAction></LongitudinalAction></PrivateAction>
            </Private></Actions></Init>"#,
        );
        let err = load_str(&text, Path::new("."), &[]).expect_err("mixed actors");
        assert!(err.chain().any(|cause| matches!(
            cause.downcast_ref::<SemanticError>(),
            Some(SemanticError::InvalidActor { .. })
        )));
    }

    #[test]
    fn added_entities_are_not_spawned() {
        let entities = format!(
            r#"{EGO}
            <ScenarioObject name="late">
              <MiscObject name="cone" mass="1" miscObjectCategory="obstacle"/>
            </ScenarioObject>"#
        );
        let text = scenario(
            "",
            &entities,
            r#"<Init><Actions><GlobalAction><EntityAction entityRef="late">
              <AddEntityAction><Position><RelativeObjectPosition entityRef="ego" dx="10" dy="0"/></Position></AddEntityAction>
            </EntityAction></GlobalAction></Actions></Init>"#,
        );
        let scenario = load_str(&text, Path::new("."), &[]).expect("load");
        let spawned = scenario
            .storyboard
            .init()
            .spawned()
            .iter()
            .map(|object| object.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(spawned, ["ego"]);
    }

    #[test]
    fn run_to_success() {
        let text = scenario(
            r#"<ParameterDeclaration name="speed" parameterType="double" value="10"/>"#,
            EGO,
            &format!(
                r#"{EGO_SPEED}
            <Story name="story">
              <ParameterDeclarations>
                <ParameterDeclaration name="threshold" parameterType="double" value="${{$speed - 1}}"/>
              </ParameterDeclarations>
              <Act name="act">
                <ManeuverGroup name="group" maximumExecutionCount="1">
                  <Actors selectTriggeringEntities="false"><EntityRef entityRef="ego"/></Actors>
                  <Maneuver name="maneuver">
                    <Event name="done" priority="overwrite">
                      <Action name="exit">
                        <UserDefinedAction><CustomCommandAction type="exitSuccess"/></UserDefinedAction>
                      </Action>
                      <StartTrigger><ConditionGroup><Condition name="fast" delay="0" conditionEdge="none">
                        <ByEntityCondition>
                          <TriggeringEntities triggeringEntitiesRule="any"><EntityRef entityRef="ego"/></TriggeringEntities>
                          <EntityCondition><SpeedCondition value="$threshold" rule="greaterThan"/></EntityCondition>
                        </ByEntityCondition>
                      </Condition></ConditionGroup></StartTrigger>
                    </Event>
                  </Maneuver>
                </ManeuverGroup>
                <StartTrigger><ConditionGroup><Condition name="start" delay="0" conditionEdge="rising">
                  <ByValueCondition><SimulationTimeCondition value="0" rule="greaterOrEqual"/></ByValueCondition>
                </Condition></ConditionGroup></StartTrigger>
              </Act>
            </Story>
            <StopTrigger><ConditionGroup><Condition name="timeout" delay="0" conditionEdge="rising">
              <ByValueCondition><SimulationTimeCondition value="5" rule="greaterThan"/></ByValueCondition>
            </Condition></ConditionGroup></StopTrigger>"#
            ),
        );
        let scenario = load_str(&text, Path::new("."), &[]).expect("load");
        let config = RunConfig {
            step: 0.1,
            max_time: 10.0,
        };
        let mut interpreter = Interpreter::new(scenario.storyboard, config);
        let mut sandbox = Sandbox::new();
        let outcome = interpreter.run(&mut sandbox, ()).expect("run");
        assert_eq!(outcome, Outcome::Success);
        assert!(sandbox.time() < 5.0);
    }
}
