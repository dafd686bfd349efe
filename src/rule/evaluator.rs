//! Rule evaluation against a message's session attributes.

use tracing::warn;

use super::model::{Check, CompiledRule, RuleField, RuleSet};

/// Session attributes of one outbound message.
///
/// Absent or empty values never satisfy a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub platform: Option<String>,
    pub bot_id: Option<String>,
    pub user_id: Option<String>,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    /// Raw message content
    pub content: Option<String>,
    /// Plain-text length of the message elements, in characters
    pub content_length: usize,
    /// Name of the command that produced the message, if any
    pub command: Option<String>,
}

/// Left-hand value of a rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
}

impl FieldValue<'_> {
    fn as_text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            FieldValue::Text(s) => std::borrow::Cow::Borrowed(*s),
            FieldValue::Number(n) => std::borrow::Cow::Owned(n.to_string()),
        }
    }
}

/// Evaluates rule sets for one session.
pub struct RuleEvaluator<'a> {
    context: &'a SessionContext,
}

impl<'a> RuleEvaluator<'a> {
    pub fn new(context: &'a SessionContext) -> Self {
        Self { context }
    }

    /// Whether any row of `rules` is fully satisfied.
    ///
    /// Rows short-circuit on their first failing rule and the set stops at the
    /// first satisfied row. An empty set, or an empty row, never matches.
    pub fn evaluate(&self, rules: &RuleSet) -> bool {
        rules.rows.iter().any(|row| {
            !row.is_empty() && row.iter().all(|rule| self.rule_matches(rule))
        })
    }

    /// Resolve a field for this session.
    ///
    /// Empty text and a zero length resolve to `None`.
    pub fn field_value(&self, field: RuleField) -> Option<FieldValue<'a>> {
        let text = |value: &'a Option<String>| {
            value
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(FieldValue::Text)
        };

        match field {
            RuleField::Platform => text(&self.context.platform),
            RuleField::Bot => text(&self.context.bot_id),
            RuleField::User => text(&self.context.user_id),
            RuleField::Group => text(&self.context.guild_id),
            RuleField::Channel => text(&self.context.channel_id),
            RuleField::Content => text(&self.context.content),
            RuleField::Length => match self.context.content_length {
                0 => None,
                n => Some(FieldValue::Number(n as f64)),
            },
            RuleField::Command => text(&self.context.command),
        }
    }

    fn rule_matches(&self, rule: &CompiledRule) -> bool {
        match self.field_value(rule.field) {
            Some(value) => check_matches(&rule.check, value),
            None => false,
        }
    }
}

/// Apply a compiled check to a left-hand value.
pub(crate) fn check_matches(check: &Check, value: FieldValue<'_>) -> bool {
    match check {
        Check::Regexp(pattern) => pattern.is_match(&value.as_text()),
        Check::Equal(expected) => value.as_text() == expected.as_str(),
        Check::NotEqual(expected) => value.as_text() != expected.as_str(),
        Check::Contain(needle) => value.as_text().contains(needle.as_str()),
        Check::NotContain(needle) => !value.as_text().contains(needle.as_str()),
        Check::Math(Err(e)) => {
            warn!("Ignoring MATH rule: {}", e);
            false
        }
        Check::Math(Ok(comparand)) => match value {
            FieldValue::Number(n) => comparand.holds(n),
            FieldValue::Text(s) => {
                warn!("MATH rule applied to non-numeric value '{}'", s);
                false
            }
        },
    }
}

// =============================================================================
// Tests
// =============================================================================
