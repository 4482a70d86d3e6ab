//! Lexical scopes of scenario parameters.
//!
//! Every element that may declare parameters opens a new frame,
//! whose parent is the frame of the enclosing element.
//! Frames live in an arena and are addressed by [`FrameId`],
//! so that a child frame can refer to its parent without borrowing it.

use hashbrown::HashMap;
use std::fmt;
use thiserror::Error;

/// An indexing object for frames in a [`Scope`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct FrameId(usize);

/// The types a parameter can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    /// `boolean`
    Boolean,
    /// `integer`, `int`
    Integer,
    /// `unsignedInt`, `unsignedShort`
    UnsignedInteger,
    /// `double`
    Double,
    /// `string`, `dateTime`
    String,
}

impl ParameterType {
    /// Parses the name of a parameter type as found in a document.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(ParameterType::Boolean),
            "integer" | "int" => Some(ParameterType::Integer),
            "unsignedInt" | "unsignedShort" => Some(ParameterType::UnsignedInteger),
            "double" => Some(ParameterType::Double),
            "string" | "dateTime" => Some(ParameterType::String),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterType::Boolean => "boolean",
            ParameterType::Integer => "integer",
            ParameterType::UnsignedInteger => "unsignedInt",
            ParameterType::Double => "double",
            ParameterType::String => "string",
        };
        f.write_str(name)
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A boolean value.
    Boolean(bool),
    /// A signed integer value.
    Integer(i64),
    /// An unsigned integer value.
    UnsignedInteger(u64),
    /// A double precision floating point value.
    Double(f64),
    /// A string value.
    String(String),
}

impl Value {
    /// Converts a textual value into a [`Value`] of the given type.
    ///
    /// Returns `None` if the text is not a valid literal of that type.
    pub fn parse(parameter_type: ParameterType, text: &str) -> Option<Self> {
        let text = text.trim();
        match parameter_type {
            ParameterType::Boolean => match text {
                "true" | "1" => Some(Value::Boolean(true)),
                "false" | "0" => Some(Value::Boolean(false)),
                _ => None,
            },
            ParameterType::Integer => text.parse().ok().map(Value::Integer),
            ParameterType::UnsignedInteger => text.parse().ok().map(Value::UnsignedInteger),
            ParameterType::Double => text.parse().ok().map(Value::Double),
            ParameterType::String => Some(Value::String(text.to_owned())),
        }
    }

    /// Returns the type of the value.
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            Value::Boolean(_) => ParameterType::Boolean,
            Value::Integer(_) => ParameterType::Integer,
            Value::UnsignedInteger(_) => ParameterType::UnsignedInteger,
            Value::Double(_) => ParameterType::Double,
            Value::String(_) => ParameterType::String,
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::UnsignedInteger(u) => Some(*u as f64),
            Value::Double(d) => Some(*d),
            Value::Boolean(_) | Value::String(_) => None,
        }
    }

    /// Converts the value to the given type, when such conversion is lossless
    /// or the value is a string holding a valid literal of that type.
    pub fn convert(&self, parameter_type: ParameterType) -> Option<Self> {
        match (self, parameter_type) {
            (value, ty) if value.parameter_type() == ty => Some(value.clone()),
            (Value::String(text), ty) => Value::parse(ty, text),
            (value, ParameterType::String) => Some(Value::String(value.to_string())),
            (Value::Integer(i), ParameterType::Double) => Some(Value::Double(*i as f64)),
            (Value::UnsignedInteger(u), ParameterType::Double) => Some(Value::Double(*u as f64)),
            (Value::UnsignedInteger(u), ParameterType::Integer) => {
                i64::try_from(*u).ok().map(Value::Integer)
            }
            (Value::Integer(i), ParameterType::UnsignedInteger) => {
                u64::try_from(*i).ok().map(Value::UnsignedInteger)
            }
            (Value::Double(d), ParameterType::Integer) if d.fract() == 0.0 => {
                Some(Value::Integer(*d as i64))
            }
            (Value::Double(d), ParameterType::UnsignedInteger)
                if d.fract() == 0.0 && *d >= 0.0 =>
            {
                Some(Value::UnsignedInteger(*d as u64))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::UnsignedInteger(u) => write!(f, "{u}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

/// Errors raised by [`Scope`] lookups and declarations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScopeError {
    /// No frame on the path to the root declares the parameter.
    #[error("undefined parameter `{0}`")]
    UndefinedParameter(String),
    /// The frame already declares a parameter with the same name.
    #[error("parameter `{0}` declared multiple times in the same scope")]
    DuplicateParameter(String),
    /// The frame does not belong to the scope.
    #[error("frame {0:?} does not belong to the scope")]
    MissingFrame(FrameId),
}

#[derive(Debug, Clone, Default)]
struct Frame {
    parent: Option<FrameId>,
    name: Option<String>,
    parameters: HashMap<String, Value>,
}

/// Arena of parameter frames.
///
/// Frame `Scope::GLOBAL` is the root and is always present.
#[derive(Debug, Clone)]
pub struct Scope {
    frames: Vec<Frame>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    /// The root frame, holding the global parameter declarations.
    pub const GLOBAL: FrameId = FrameId(0);

    /// Creates a scope with only the global frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    /// Opens a new frame nested into `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this scope,
    /// which can only happen when mixing frames of different scopes.
    pub fn push(&mut self, parent: FrameId, name: Option<&str>) -> FrameId {
        assert!(parent.0 < self.frames.len(), "parent frame belongs to scope");
        let id = FrameId(self.frames.len());
        self.frames.push(Frame {
            parent: Some(parent),
            name: name.map(str::to_owned),
            parameters: HashMap::new(),
        });
        id
    }

    /// Declares a parameter in the given frame.
    ///
    /// Declaring the same name twice in the same frame is an error,
    /// while shadowing a name declared by an ancestor frame is allowed.
    pub fn declare(&mut self, frame: FrameId, name: &str, value: Value) -> Result<(), ScopeError> {
        let frame = self
            .frames
            .get_mut(frame.0)
            .ok_or(ScopeError::MissingFrame(frame))?;
        if frame.parameters.contains_key(name) {
            return Err(ScopeError::DuplicateParameter(name.to_owned()));
        }
        frame.parameters.insert(name.to_owned(), value);
        Ok(())
    }

    /// Replaces the value of a parameter declared exactly in `frame`.
    pub fn assign(&mut self, frame: FrameId, name: &str, value: Value) -> Result<(), ScopeError> {
        let slot = self
            .frames
            .get_mut(frame.0)
            .ok_or(ScopeError::MissingFrame(frame))?
            .parameters
            .get_mut(name)
            .ok_or_else(|| ScopeError::UndefinedParameter(name.to_owned()))?;
        *slot = value;
        Ok(())
    }

    /// Resolves a parameter name, walking up from `frame` to the root.
    ///
    /// A leading `$` (as used by parameter references in documents) is ignored.
    pub fn resolve(&self, frame: FrameId, name: &str) -> Result<&Value, ScopeError> {
        let name = name.strip_prefix('$').unwrap_or(name);
        let mut current = Some(frame);
        while let Some(id) = current {
            let frame = self.frames.get(id.0).ok_or(ScopeError::MissingFrame(id))?;
            if let Some(value) = frame.parameters.get(name) {
                return Ok(value);
            }
            current = frame.parent;
        }
        Err(ScopeError::UndefinedParameter(name.to_owned()))
    }

    /// Returns the qualified name of a frame, e.g. `story::act`.
    pub fn path(&self, frame: FrameId) -> String {
        let mut names = Vec::new();
        let mut current = Some(frame);
        while let Some(id) = current {
            let Some(frame) = self.frames.get(id.0) else {
                break;
            };
            if let Some(name) = &frame.name {
                names.push(name.as_str());
            }
            current = frame.parent;
        }
        names.reverse();
        names.join("::")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing() {
        let mut scope = Scope::new();
        scope
            .declare(Scope::GLOBAL, "x", Value::Integer(1))
            .expect("declare global");
        let child = scope.push(Scope::GLOBAL, Some("child"));
        scope
            .declare(child, "x", Value::Integer(2))
            .expect("shadow in child");
        let grandchild = scope.push(child, Some("grandchild"));
        assert_eq!(scope.resolve(grandchild, "x"), Ok(&Value::Integer(2)));
        assert_eq!(scope.resolve(Scope::GLOBAL, "$x"), Ok(&Value::Integer(1)));
        assert_eq!(scope.path(grandchild), "child::grandchild");
    }

    #[test]
    fn undefined() {
        let mut scope = Scope::new();
        let child = scope.push(Scope::GLOBAL, None);
        scope
            .declare(child, "local", Value::Boolean(true))
            .expect("declare");
        assert_eq!(
            scope.resolve(Scope::GLOBAL, "local"),
            Err(ScopeError::UndefinedParameter("local".to_string()))
        );
    }

    #[test]
    fn duplicate() {
        let mut scope = Scope::new();
        scope
            .declare(Scope::GLOBAL, "x", Value::Double(1.0))
            .expect("declare");
        assert_eq!(
            scope.declare(Scope::GLOBAL, "x", Value::Double(2.0)),
            Err(ScopeError::DuplicateParameter("x".to_string()))
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(
            Value::parse(ParameterType::Double, " 2.5 "),
            Some(Value::Double(2.5))
        );
        assert_eq!(Value::parse(ParameterType::Integer, "2.5"), None);
        assert_eq!(
            Value::Integer(3).convert(ParameterType::Double),
            Some(Value::Double(3.0))
        );
        assert_eq!(
            Value::String("true".to_string()).convert(ParameterType::Boolean),
            Some(Value::Boolean(true))
        );
        assert_eq!(Value::Integer(-1).convert(ParameterType::UnsignedInteger), None);
    }
}
