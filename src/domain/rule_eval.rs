//! Rule evaluation engine.
//!
//! Evaluates rules against pre-computed indicator series at a candle index.
//!
//! # Evaluation Semantics
//!
//! - Missing field, missing sub-field, or no value at the index: `false`
//! - `>`, `<`, `>=`, `<=`, `==`: compare the value at `index` to the threshold
//!   (`==` is exact floating-point equality)
//! - `crosses_above`: `index >= 1`, `previous <= threshold && current > threshold`
//! - `crosses_below`: `index >= 1`, `previous >= threshold && current < threshold`
//! - Entry: every entry rule holds (an empty entry set never fires)
//! - Exit: any exit rule holds

use crate::domain::indicator::IndicatorSet;
use crate::domain::rule::{Rule, RuleOperator, RuleSet, split_field};

/// Value of `field` (`key` or `key.sub`) at candle `index`, if present.
pub fn resolve_field(indicators: &IndicatorSet, field: &str, index: usize) -> Option<f64> {
    let (key, sub) = split_field(field);
    indicators
        .get(key)?
        .value_at(index)?
        .field(sub)
        .filter(|v| !v.is_nan())
}

pub fn evaluate_at(rule: &Rule, indicators: &IndicatorSet, index: usize) -> bool {
    let Some(current) = resolve_field(indicators, &rule.field, index) else {
        return false;
    };
    let threshold = rule.value;

    match rule.operator {
        RuleOperator::GreaterThan => current > threshold,
        RuleOperator::LessThan => current < threshold,
        RuleOperator::GreaterOrEqual => current >= threshold,
        RuleOperator::LessOrEqual => current <= threshold,
        RuleOperator::Equal => current == threshold,
        RuleOperator::CrossesAbove => {
            if index == 0 {
                return false;
            }
            match resolve_field(indicators, &rule.field, index - 1) {
                Some(previous) => previous <= threshold && current > threshold,
                None => false,
            }
        }
        RuleOperator::CrossesBelow => {
            if index == 0 {
                return false;
            }
            match resolve_field(indicators, &rule.field, index - 1) {
                Some(previous) => previous >= threshold && current < threshold,
                None => false,
            }
        }
    }
}

/// AND over the entry rules; short-circuits on the first `false`.
pub fn evaluate_entry(rules: &RuleSet, indicators: &IndicatorSet, index: usize) -> bool {
    !rules.entry.is_empty()
        && rules
            .entry
            .iter()
            .all(|rule| evaluate_at(rule, indicators, index))
}

/// OR over the exit rules; short-circuits on the first `true`.
pub fn evaluate_exit(rules: &RuleSet, indicators: &IndicatorSet, index: usize) -> bool {
    rules
        .exit
        .iter()
        .any(|rule| evaluate_at(rule, indicators, index))
}
