//! Rule definitions and load-time compilation.
//!
//! Rules are written as JSON: a rule set is a list of rows, each row a list of
//! rules. A row matches when all its rules match; the set matches when any row
//! does.
//!
//! ```json
//! [
//!   [
//!     { "field": "platform", "operator": "EQUAL", "comparand": "qq" },
//!     { "field": "length", "operator": "MATH", "comparand": "GT:300" }
//!   ],
//!   [
//!     { "field": "command", "operator": "REGEXP", "comparand": "^(help|status)$" }
//!   ]
//! ]
//! ```

use std::fmt;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RuleError};

// =============================================================================
// Rule Definition
// =============================================================================

/// Session attribute a rule reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleField {
    Platform,
    Bot,
    User,
    Group,
    Channel,
    Content,
    Length,
    Command,
}

impl RuleField {
    pub fn name(self) -> &'static str {
        match self {
            RuleField::Platform => "platform",
            RuleField::Bot => "bot",
            RuleField::User => "user",
            RuleField::Group => "group",
            RuleField::Channel => "channel",
            RuleField::Content => "content",
            RuleField::Length => "length",
            RuleField::Command => "command",
        }
    }

    /// Whether `operator` may be used with this field.
    pub fn accepts(self, operator: RuleOperator) -> bool {
        match self {
            RuleField::Length => operator == RuleOperator::Math,
            RuleField::Command => operator != RuleOperator::Math,
            _ => true,
        }
    }
}

/// Comparison applied between the field value and the comparand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleOperator {
    Regexp,
    Equal,
    NotEqual,
    Contain,
    NotContain,
    Math,
}

impl RuleOperator {
    pub fn name(self) -> &'static str {
        match self {
            RuleOperator::Regexp => "REGEXP",
            RuleOperator::Equal => "EQUAL",
            RuleOperator::NotEqual => "NOT_EQUAL",
            RuleOperator::Contain => "CONTAIN",
            RuleOperator::NotContain => "NOT_CONTAIN",
            RuleOperator::Math => "MATH",
        }
    }
}

/// A single condition as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub field: RuleField,
    pub operator: RuleOperator,
    #[serde(default)]
    pub comparand: String,
}

impl Rule {
    pub fn new(field: RuleField, operator: RuleOperator, comparand: impl Into<String>) -> Self {
        Self {
            field,
            operator,
            comparand: comparand.into(),
        }
    }
}

/// Rules that must all match.
pub type RuleRow = Vec<Rule>;

// =============================================================================
// MATH Comparand
// =============================================================================

/// Numeric comparison of a MATH rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathTag {
    Gt,
    Ge,
    Lt,
    Le,
}

/// A parsed `TAG:number` comparand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MathComparand {
    pub tag: MathTag,
    pub value: f64,
}

impl MathComparand {
    /// Parse a comparand such as `GT:10` or `LE:2.5`.
    pub fn parse(comparand: &str) -> Result<Self, RuleError> {
        let (tag, value) = comparand.split_once(':').unwrap_or((comparand, ""));

        let value: f64 = value
            .trim()
            .parse()
            .ok()
            .filter(|v: &f64| !v.is_nan())
            .ok_or_else(|| RuleError::MalformedNumber {
                comparand: comparand.to_string(),
            })?;

        let tag = match tag.trim() {
            "GT" => MathTag::Gt,
            "GE" => MathTag::Ge,
            "LT" => MathTag::Lt,
            "LE" => MathTag::Le,
            _ => {
                return Err(RuleError::UnknownMathTag {
                    comparand: comparand.to_string(),
                })
            }
        };

        Ok(Self { tag, value })
    }

    pub fn holds(&self, lefthand: f64) -> bool {
        match self.tag {
            MathTag::Gt => lefthand > self.value,
            MathTag::Ge => lefthand >= self.value,
            MathTag::Lt => lefthand < self.value,
            MathTag::Le => lefthand <= self.value,
        }
    }
}

// =============================================================================
// Compiled Rules
// =============================================================================

/// Operator with its comparand prepared for evaluation.
#[derive(Debug, Clone)]
pub(crate) enum Check {
    Regexp(Regex),
    Equal(String),
    NotEqual(String),
    Contain(String),
    NotContain(String),
    /// A malformed comparand is kept so it can be reported when evaluated.
    Math(Result<MathComparand, RuleError>),
}

/// A validated rule ready for evaluation.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub(crate) field: RuleField,
    pub(crate) check: Check,
}

impl CompiledRule {
    fn compile(rule: &Rule, row: usize, index: usize) -> Result<Self, ConfigError> {
        if !rule.field.accepts(rule.operator) {
            return Err(ConfigError::InvalidRulePairing {
                row,
                index,
                field: rule.field.name(),
                operator: rule.operator.name(),
            });
        }

        let comparand = rule.comparand.clone();
        let check = match rule.operator {
            RuleOperator::Regexp => {
                Check::Regexp(Regex::new(&comparand).map_err(|e| ConfigError::InvalidPattern {
                    row,
                    index,
                    pattern: comparand.clone(),
                    message: e.to_string(),
                })?)
            }
            RuleOperator::Equal => Check::Equal(comparand),
            RuleOperator::NotEqual => Check::NotEqual(comparand),
            RuleOperator::Contain => Check::Contain(comparand),
            RuleOperator::NotContain => Check::NotContain(comparand),
            RuleOperator::Math => Check::Math(MathComparand::parse(&comparand)),
        };

        Ok(Self {
            field: rule.field,
            check,
        })
    }

    /// The field this rule reads.
    pub fn field(&self) -> RuleField {
        self.field
    }
}

// =============================================================================
// Rule Set
// =============================================================================

/// Rows of rules, OR-combined. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub(crate) rows: Vec<Vec<CompiledRule>>,
}

impl RuleSet {
    /// Validate and compile rule rows.
    ///
    /// Fails on the first rule that pairs a field with an operator it does not
    /// support, or whose REGEXP comparand does not compile.
    pub fn compile(rows: &[RuleRow]) -> Result<Self, ConfigError> {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                row.iter()
                    .enumerate()
                    .map(|(idx, rule)| CompiledRule::compile(rule, row_idx, idx))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rows })
    }

    /// Parse and compile a JSON rule set.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let rows: Vec<RuleRow> = serde_json::from_str(json).map_err(|e| ConfigError::RulesFile {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        Self::compile(&rows)
    }

    /// Load a JSON rule set from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let rules_file_error = |message: String| ConfigError::RulesFile {
            path: path.display().to_string(),
            message,
        };
        let json = std::fs::read_to_string(path).map_err(|e| rules_file_error(e.to_string()))?;
        let rows: Vec<RuleRow> =
            serde_json::from_str(&json).map_err(|e| rules_file_error(e.to_string()))?;
        Self::compile(&rows)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total number of rules across all rows.
    pub fn rule_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for RuleOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Tests
// =============================================================================
