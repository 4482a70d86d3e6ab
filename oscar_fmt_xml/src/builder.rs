//! Builder turning a document tree into the scenario executed by `oscar_core`.
//!
//! The builder walks the tree depth-first,
//! resolving parameter references and expressions through the lexical [`Scope`]
//! as it goes, and instantiating the `oscar_core` types.

mod action;
mod condition;
mod entities;
mod storyboard;

use crate::Scenario;
use crate::catalog::{CatalogKind, Catalogs};
use crate::parser::*;
use anyhow::{Context, anyhow, bail};
use hashbrown::HashSet;
use log::{error, info, trace, warn};
use oscar_core::entities::{Entities, SemanticError};
use oscar_core::scope::{FrameId, ParameterType, Scope, ScopeError, Value};
use std::path::{Path, PathBuf};

/// The `FileHeader` of a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileHeader {
    /// Major revision of the format.
    pub rev_major: u64,
    /// Minor revision of the format.
    pub rev_minor: u64,
    /// Date of the document.
    pub date: String,
    /// Description of the scenario.
    pub description: String,
    /// Author of the document.
    pub author: String,
}

/// Resolves a raw attribute value: `$name` is a parameter reference,
/// `${...}` an expression, anything else a literal string.
pub(crate) fn resolve(scope: &Scope, frame: FrameId, raw: &str) -> anyhow::Result<Value> {
    if let Some(body) = raw.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        trace!(target: "builder", "evaluating expression '{raw}'");
        parse_expression(body)
            .and_then(|expr| expr.evaluate(scope, frame))
            .map_err(|err| {
                error!(target: "builder", "invalid expression '{raw}': {err}");
                anyhow!(DocumentError::Expression {
                    expression: raw.to_owned(),
                    reason: err.to_string(),
                })
            })
    } else if raw.starts_with('$') {
        scope.resolve(frame, raw).cloned().map_err(|err| {
            error!(target: "builder", "cannot resolve '{raw}' in '{}': {err}", scope.path(frame));
            anyhow!(err)
        })
    } else {
        Ok(Value::String(raw.to_owned()))
    }
}

/// Typed access to the attributes of an element, resolved in a frame.
pub(crate) struct Attributes<'a> {
    scope: &'a Scope,
    frame: FrameId,
    element: &'a Element,
}

impl Attributes<'_> {
    /// The resolved value of an attribute, if present.
    pub(crate) fn value(&self, key: &str) -> anyhow::Result<Option<Value>> {
        self.element
            .attribute(key)
            .map(|raw| resolve(self.scope, self.frame, raw))
            .transpose()
            .with_context(|| {
                format!(
                    "failed to read attribute '{key}' of '{}' at line {}",
                    self.element.tag, self.element.line
                )
            })
    }

    fn required_value(&self, key: &str) -> anyhow::Result<Value> {
        self.value(key)?.ok_or_else(|| {
            error!(target: "builder", "missing required attribute '{key}' in '{}' at line {}", self.element.tag, self.element.line);
            anyhow!(DocumentError::MissingAttribute {
                element: self.element.tag.clone(),
                attribute: key.to_owned(),
            })
        })
    }

    fn mismatch(&self, key: &str, value: &Value, expected: &str) -> anyhow::Error {
        error!(target: "builder", "attribute '{key}' of '{}' at line {}: '{value}' is not a {expected}", self.element.tag, self.element.line);
        anyhow!(DocumentError::TypeMismatch {
            element: self.element.tag.clone(),
            attribute: key.to_owned(),
            value: value.to_string(),
            expected: expected.to_owned(),
        })
    }

    fn to_double(&self, key: &str, value: Value) -> anyhow::Result<f64> {
        match value.convert(ParameterType::Double) {
            Some(Value::Double(d)) => Ok(d),
            _ => Err(self.mismatch(key, &value, "double")),
        }
    }

    fn to_integer(&self, key: &str, value: Value) -> anyhow::Result<i64> {
        match value.convert(ParameterType::Integer) {
            Some(Value::Integer(i)) => Ok(i),
            _ => Err(self.mismatch(key, &value, "integer")),
        }
    }

    fn to_unsigned(&self, key: &str, value: Value) -> anyhow::Result<u64> {
        match value.convert(ParameterType::UnsignedInteger) {
            Some(Value::UnsignedInteger(u)) => Ok(u),
            _ => Err(self.mismatch(key, &value, "unsigned integer")),
        }
    }

    fn to_boolean(&self, key: &str, value: Value) -> anyhow::Result<bool> {
        match value.convert(ParameterType::Boolean) {
            Some(Value::Boolean(b)) => Ok(b),
            _ => Err(self.mismatch(key, &value, "boolean")),
        }
    }

    pub(crate) fn opt_string(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.value(key)?.map(|value| value.to_string()))
    }

    pub(crate) fn string(&self, key: &str) -> anyhow::Result<String> {
        Ok(self.required_value(key)?.to_string())
    }

    pub(crate) fn opt_double(&self, key: &str) -> anyhow::Result<Option<f64>> {
        self.value(key)?
            .map(|value| self.to_double(key, value))
            .transpose()
    }

    pub(crate) fn double(&self, key: &str) -> anyhow::Result<f64> {
        self.to_double(key, self.required_value(key)?)
    }

    pub(crate) fn integer(&self, key: &str) -> anyhow::Result<i64> {
        self.to_integer(key, self.required_value(key)?)
    }

    pub(crate) fn opt_unsigned(&self, key: &str) -> anyhow::Result<Option<u64>> {
        self.value(key)?
            .map(|value| self.to_unsigned(key, value))
            .transpose()
    }

    pub(crate) fn opt_boolean(&self, key: &str) -> anyhow::Result<Option<bool>> {
        self.value(key)?
            .map(|value| self.to_boolean(key, value))
            .transpose()
    }

    pub(crate) fn boolean(&self, key: &str) -> anyhow::Result<bool> {
        self.to_boolean(key, self.required_value(key)?)
    }

    /// An attribute whose value belongs to an enumeration.
    pub(crate) fn opt_enumeration<T>(
        &self,
        key: &str,
        parse: impl Fn(&str) -> Option<T>,
        expected: &str,
    ) -> anyhow::Result<Option<T>> {
        self.value(key)?
            .map(|value| {
                parse(&value.to_string()).ok_or_else(|| self.mismatch(key, &value, expected))
            })
            .transpose()
    }

    pub(crate) fn enumeration<T>(
        &self,
        key: &str,
        parse: impl Fn(&str) -> Option<T>,
        expected: &str,
    ) -> anyhow::Result<T> {
        let value = self.required_value(key)?;
        parse(&value.to_string()).ok_or_else(|| self.mismatch(key, &value, expected))
    }
}

fn unsupported(element: &Element) -> anyhow::Error {
    error!(target: "builder", "unsupported element '{}' at line {}", element.tag, element.line);
    anyhow!(DocumentError::UnsupportedElement(element.tag.clone()))
}

/// State threaded through the construction of a scenario.
#[derive(Debug)]
pub(crate) struct LoadContext {
    scope: Scope,
    catalogs: Catalogs,
    entities: Entities,
    base_dir: PathBuf,
    // Objects added by an `AddEntityAction` are not spawned at start.
    added: HashSet<String>,
}

impl LoadContext {
    fn new(base_dir: &Path) -> Self {
        Self {
            scope: Scope::new(),
            catalogs: Catalogs::default(),
            entities: Entities::new(),
            base_dir: base_dir.to_owned(),
            added: HashSet::new(),
        }
    }

    pub(crate) fn attrs<'a>(&'a self, frame: FrameId, element: &'a Element) -> Attributes<'a> {
        Attributes {
            scope: &self.scope,
            frame,
            element,
        }
    }

    fn check_entity(&self, name: &str) -> Result<(), SemanticError> {
        if self.entities.contains(name) {
            Ok(())
        } else {
            error!(target: "builder", "unknown entity '{name}'");
            Err(SemanticError::UnknownEntity(name.to_owned()))
        }
    }

    /// Declares the parameters of an element in a frame.
    ///
    /// Values in `overrides` replace the declared defaults and are removed from it,
    /// so that whatever is left names no declared parameter.
    fn declare_parameters(
        &mut self,
        frame: FrameId,
        element: &Element,
        overrides: &mut Vec<(String, Value)>,
    ) -> anyhow::Result<()> {
        let Some(declarations) = element.child(TAG_PARAMETER_DECLARATIONS) else {
            return Ok(());
        };
        for declaration in declarations.children_named(TAG_PARAMETER_DECLARATION) {
            let attrs = self.attrs(frame, declaration);
            let name = attrs.string(ATTR_NAME)?;
            let parameter_type =
                attrs.enumeration(ATTR_PARAMETER_TYPE, ParameterType::from_name, "parameter type")?;
            let value = match overrides.iter().rposition(|(n, _)| *n == name) {
                Some(index) => {
                    let value = overrides[index].1.clone();
                    overrides.retain(|(n, _)| *n != name);
                    info!(target: "builder", "parameter '{name}' overridden with '{value}'");
                    value
                }
                None => attrs.required_value(ATTR_VALUE)?,
            };
            let value = value.convert(parameter_type).ok_or_else(|| {
                error!(target: "builder", "parameter '{name}': '{value}' is not a {parameter_type}");
                anyhow!(DocumentError::TypeMismatch {
                    element: TAG_PARAMETER_DECLARATION.to_owned(),
                    attribute: name.clone(),
                    value: value.to_string(),
                    expected: parameter_type.to_string(),
                })
            })?;
            trace!(target: "builder", "declare parameter '{name}' = {value} in '{}'", self.scope.path(frame));
            self.scope
                .declare(frame, &name, value)
                .with_context(|| format!("failed to declare parameter at line {}", declaration.line))?;
        }
        Ok(())
    }

    /// Opens a frame for an element and declares its parameters.
    fn open_frame(&mut self, parent: FrameId, name: &str, element: &Element) -> anyhow::Result<FrameId> {
        let frame = self.scope.push(parent, Some(name));
        self.declare_parameters(frame, element, &mut Vec::new())?;
        Ok(frame)
    }

    /// Resolves a catalog reference into a copy of the entry,
    /// and a new frame holding the entry's parameters as assigned by the reference.
    fn instantiate(
        &mut self,
        frame: FrameId,
        reference: &Element,
        kinds: &[CatalogKind],
    ) -> anyhow::Result<(Element, FrameId)> {
        let attrs = self.attrs(frame, reference);
        let catalog = attrs.string(ATTR_CATALOG_NAME)?;
        let entry_name = attrs.string(ATTR_ENTRY_NAME)?;
        let mut assignments = Vec::new();
        if let Some(list) = reference.child(TAG_PARAMETER_ASSIGNMENTS) {
            for assignment in list.children_named(TAG_PARAMETER_ASSIGNMENT) {
                let attrs = self.attrs(frame, assignment);
                let name = attrs.string(ATTR_PARAMETER_REF)?;
                let value = attrs.required_value(ATTR_VALUE)?;
                assignments.push((name.trim_start_matches('$').to_owned(), value));
            }
        }
        let entry = self
            .catalogs
            .entry(kinds, &catalog, &entry_name)
            .with_context(|| format!("failed to resolve catalog reference at line {}", reference.line))?;
        info!(target: "builder", "instantiating '{entry_name}' from catalog '{catalog}'");
        let entry_frame = self.scope.push(frame, Some(&entry_name));
        self.declare_parameters(entry_frame, &entry, &mut assignments)?;
        if let Some((name, _)) = assignments.first() {
            error!(target: "builder", "entry '{entry_name}' declares no parameter '{name}'");
            bail!(ScopeError::UndefinedParameter(name.to_owned()));
        }
        Ok((entry, entry_frame))
    }

    fn catalog_locations(&mut self, element: &Element) -> anyhow::Result<()> {
        for location in &element.children {
            let kind = CatalogKind::from_tag(&location.tag).ok_or_else(|| unsupported(location))?;
            let directory = location.required(TAG_DIRECTORY)?;
            let path = self.attrs(Scope::GLOBAL, directory).string(ATTR_PATH)?;
            let path = self.base_dir.join(path);
            self.catalogs.set_directory(kind, path);
        }
        Ok(())
    }
}

fn file_header(element: &Element) -> anyhow::Result<FileHeader> {
    let scope = Scope::new();
    let attrs = Attributes {
        scope: &scope,
        frame: Scope::GLOBAL,
        element,
    };
    Ok(FileHeader {
        rev_major: attrs.opt_unsigned(ATTR_REV_MAJOR)?.unwrap_or(1),
        rev_minor: attrs.opt_unsigned(ATTR_REV_MINOR)?.unwrap_or(0),
        date: attrs.opt_string(ATTR_DATE)?.unwrap_or_default(),
        description: attrs.opt_string(ATTR_DESCRIPTION)?.unwrap_or_default(),
        author: attrs.opt_string(ATTR_AUTHOR)?.unwrap_or_default(),
    })
}

/// Builds the scenario described by the root element of a document.
///
/// `overrides` replace the defaults of the global parameter declarations.
pub(crate) fn build(
    root: &Element,
    base_dir: &Path,
    overrides: &[(String, String)],
) -> anyhow::Result<Scenario> {
    if root.tag != TAG_OPENSCENARIO {
        return Err(unsupported(root));
    }
    let header = file_header(root.required(TAG_FILE_HEADER)?)?;
    info!(target: "builder", "building scenario '{}'", header.description);
    let mut ctx = LoadContext::new(base_dir);

    let mut overrides = overrides
        .iter()
        .map(|(name, text)| (name.clone(), Value::String(text.clone())))
        .collect::<Vec<_>>();
    ctx.declare_parameters(Scope::GLOBAL, root, &mut overrides)
        .context("failed to declare global parameters")?;
    if let Some((name, _)) = overrides.first() {
        error!(target: "builder", "override of undeclared parameter '{name}'");
        bail!(ScopeError::UndefinedParameter(name.to_owned()));
    }

    if let Some(locations) = root.child(TAG_CATALOG_LOCATIONS) {
        ctx.catalog_locations(locations)?;
    }
    if root.child(TAG_ROAD_NETWORK).is_some() {
        warn!(target: "builder", "road network ignored");
    }
    ctx.entities(root.required(TAG_ENTITIES)?)
        .context("failed to build entities")?;
    let storyboard = ctx
        .storyboard(root.required(TAG_STORYBOARD)?)
        .context("failed to build storyboard")?;
    info!(target: "builder", "scenario built");
    Ok(Scenario {
        header,
        entities: ctx.entities,
        scope: ctx.scope,
        storyboard,
    })
}
