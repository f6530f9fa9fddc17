//! Rule data structures.
//!
//! A `Rule` compares one indicator field against a constant threshold:
//! - `field`: indicator key, optionally with a sub-field (`macd.histogram`)
//! - `operator`: comparison or crossover
//! - `value`: threshold
//!
//! A `RuleSet` holds entry rules (all must hold) and exit rules (any may hold).

use crate::domain::error::RuletraderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleOperator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "crosses_above")]
    CrossesAbove,
    #[serde(rename = "crosses_below")]
    CrossesBelow,
}

impl RuleOperator {
    pub const ALL: [RuleOperator; 7] = [
        RuleOperator::GreaterOrEqual,
        RuleOperator::LessOrEqual,
        RuleOperator::Equal,
        RuleOperator::GreaterThan,
        RuleOperator::LessThan,
        RuleOperator::CrossesAbove,
        RuleOperator::CrossesBelow,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            RuleOperator::GreaterThan => ">",
            RuleOperator::LessThan => "<",
            RuleOperator::GreaterOrEqual => ">=",
            RuleOperator::LessOrEqual => "<=",
            RuleOperator::Equal => "==",
            RuleOperator::CrossesAbove => "crosses_above",
            RuleOperator::CrossesBelow => "crosses_below",
        }
    }

    pub fn is_crossover(&self) -> bool {
        matches!(self, RuleOperator::CrossesAbove | RuleOperator::CrossesBelow)
    }
}

impl fmt::Display for RuleOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for RuleOperator {
    type Err = RuletraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        RuleOperator::ALL
            .into_iter()
            .find(|op| op.symbol().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                RuletraderError::validation("rule operator", format!("unknown operator '{s}'"))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub field: String,
    pub operator: RuleOperator,
    pub value: f64,
}

impl Rule {
    /// Build a validated rule.
    pub fn new(
        field: impl Into<String>,
        operator: RuleOperator,
        value: f64,
    ) -> Result<Self, RuletraderError> {
        let rule = Rule {
            field: field.into(),
            operator,
            value,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<(), RuletraderError> {
        let (key, sub) = self.field_parts();
        if key.is_empty() || sub.is_some_and(str::is_empty) {
            return Err(RuletraderError::validation(
                "rule field",
                format!("'{}' must name an indicator field", self.field),
            ));
        }
        if !self.value.is_finite() {
            return Err(RuletraderError::validation(
                "rule value",
                format!("threshold for '{}' must be a finite number", self.field),
            ));
        }
        Ok(())
    }

    /// Split `key.sub` into the indicator key and optional sub-field.
    pub fn field_parts(&self) -> (&str, Option<&str>) {
        split_field(&self.field)
    }
}

/// `key.sub` to `(key, Some(sub))`, both trimmed; a bare key has no sub-field.
pub fn split_field(field: &str) -> (&str, Option<&str>) {
    let field = field.trim();
    match field.split_once('.') {
        Some((key, sub)) => (key.trim(), Some(sub.trim())),
        None => (field, None),
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub entry: Vec<Rule>,
    pub exit: Vec<Rule>,
}

impl RuleSet {
    pub fn new(entry: Vec<Rule>, exit: Vec<Rule>) -> Self {
        Self { entry, exit }
    }

    pub fn validate(&self) -> Result<(), RuletraderError> {
        if self.entry.is_empty() {
            return Err(RuletraderError::validation(
                "entry rules",
                "at least one entry rule is required",
            ));
        }
        self.entry.iter().chain(&self.exit).try_for_each(Rule::validate)
    }

    /// Indicator keys referenced by any rule, in first-seen order.
    pub fn referenced_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for rule in self.entry.iter().chain(&self.exit) {
            let (key, _) = rule.field_parts();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}
