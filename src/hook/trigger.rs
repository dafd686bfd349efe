use tracing::debug;

use super::message::OutboundMessage;
use crate::element::{content_length, has_platform_elements, line_count};
use crate::rule::{RuleEvaluator, RuleSet};

/// Default plain-text length above which a message is converted.
pub const DEFAULT_MAX_LENGTH: usize = 648;

/// Default line count above which a message is converted.
pub const DEFAULT_MAX_LINE_COUNT: usize = 20;

/// Decides whether a message is converted to an image.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Fires for messages without platform-specific elements that are longer
    /// than `max_length` characters or have more than `max_line_count` lines.
    Threshold {
        max_length: usize,
        max_line_count: usize,
    },

    /// Fires when the rule set matches the message's session.
    Advanced(RuleSet),
}

impl Default for Trigger {
    fn default() -> Self {
        Trigger::Threshold {
            max_length: DEFAULT_MAX_LENGTH,
            max_line_count: DEFAULT_MAX_LINE_COUNT,
        }
    }
}

impl Trigger {
    pub fn fires(&self, message: &OutboundMessage) -> bool {
        match self {
            Trigger::Threshold {
                max_length,
                max_line_count,
            } => {
                if has_platform_elements(&message.elements, message.platform()) {
                    debug!("Message has {} elements, not converting", message.platform());
                    return false;
                }
                let length = content_length(&message.elements);
                let lines = line_count(&message.elements);
                debug!("Message length {}, {} line(s)", length, lines);
                length > *max_length || lines > *max_line_count
            }
            Trigger::Advanced(rules) => {
                let context = message.session_context();
                RuleEvaluator::new(&context).evaluate(rules)
            }
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Trigger::Threshold { .. } => "threshold",
            Trigger::Advanced(_) => "advanced",
        }
    }
}
