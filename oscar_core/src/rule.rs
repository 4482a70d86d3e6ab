use crate::approx_eq;
use serde::Serialize;
use std::fmt;

/// Ordering rule comparing a measured quantity against a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rule {
    /// `lessThan`
    LessThan,
    /// `lessOrEqual`
    LessOrEqual,
    /// `equalTo`
    EqualTo,
    /// `notEqualTo`
    NotEqualTo,
    /// `greaterOrEqual`
    GreaterOrEqual,
    /// `greaterThan`
    GreaterThan,
}

impl Rule {
    /// Parses the name of a rule as found in documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "lessThan" => Some(Rule::LessThan),
            "lessOrEqual" => Some(Rule::LessOrEqual),
            "equalTo" => Some(Rule::EqualTo),
            "notEqualTo" => Some(Rule::NotEqualTo),
            "greaterOrEqual" => Some(Rule::GreaterOrEqual),
            "greaterThan" => Some(Rule::GreaterThan),
            _ => None,
        }
    }

    /// Compares `lhs` against `rhs`.
    ///
    /// If either operand is not finite (including `NaN`) the comparison is `false`,
    /// whatever the rule.
    pub fn apply(&self, lhs: f64, rhs: f64) -> bool {
        if !lhs.is_finite() || !rhs.is_finite() {
            return false;
        }
        match self {
            Rule::LessThan => lhs < rhs,
            Rule::LessOrEqual => lhs <= rhs || approx_eq(lhs, rhs),
            Rule::EqualTo => approx_eq(lhs, rhs),
            Rule::NotEqualTo => !approx_eq(lhs, rhs),
            Rule::GreaterOrEqual => lhs >= rhs || approx_eq(lhs, rhs),
            Rule::GreaterThan => lhs > rhs,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Rule::LessThan => "<",
            Rule::LessOrEqual => "<=",
            Rule::EqualTo => "==",
            Rule::NotEqualTo => "!=",
            Rule::GreaterOrEqual => ">=",
            Rule::GreaterThan => ">",
        };
        f.write_str(symbol)
    }
}
