//! Trigger rules.
//!
//! In advanced mode the decision to render a message is driven by a
//! [`RuleSet`] loaded from configuration. Rules are validated when loaded:
//! `length` only accepts `MATH`, `command` never accepts it, and `REGEXP`
//! patterns must compile. Problems found at evaluation time (a malformed
//! `MATH` comparand, a non-numeric left-hand side) are logged and make the
//! rule false.
//!
//! # Example
//!
//! ```
//! use imagify::rule::{RuleEvaluator, RuleSet, SessionContext};
//!
//! let rules = RuleSet::from_json(
//!     r#"[[{ "field": "length", "operator": "MATH", "comparand": "GT:10" }]]"#,
//! )
//! .unwrap();
//!
//! let context = SessionContext {
//!     content_length: 11,
//!     ..Default::default()
//! };
//! assert!(RuleEvaluator::new(&context).evaluate(&rules));
//! ```

mod evaluator;
mod model;

pub use evaluator::{FieldValue, RuleEvaluator, SessionContext};
pub use model::{
    CompiledRule, MathComparand, MathTag, Rule, RuleField, RuleOperator, RuleRow, RuleSet,
};
