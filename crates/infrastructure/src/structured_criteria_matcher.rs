//! Default where-clause evaluation over JSON record fields.

use std::cmp::Ordering;

use rowguard_application::CriteriaMatcher;
use rowguard_core::{AppError, AppResult};
use rowguard_domain::{
    CriteriaGroup, CriteriaNode, CriteriaOperator, FieldCondition, LogicalMode, Record,
    WhereClause,
};
use serde_json::{Number, Value};

/// Criteria matcher evaluating parsed where-clauses in memory.
///
/// Equality is exact; numbers compare by value so `5` equals `5.0`, and
/// integers beyond `f64` precision stay distinct. Text
/// search operators ignore case. Ordering operators accept number/number or
/// text/text pairs and fail with [`AppError::CriteriaEvaluation`] otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredCriteriaMatcher;

impl StructuredCriteriaMatcher {
    /// Creates a matcher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CriteriaMatcher for StructuredCriteriaMatcher {
    fn filter<'a>(
        &self,
        where_clause: &WhereClause,
        records: &'a [Record],
    ) -> AppResult<Vec<&'a Record>> {
        let mut matched = Vec::new();
        for record in records {
            if group_matches(where_clause.root(), record)? {
                matched.push(record);
            }
        }

        Ok(matched)
    }
}

fn group_matches(group: &CriteriaGroup, record: &Record) -> AppResult<bool> {
    let evaluate = |node: &CriteriaNode| match node {
        CriteriaNode::Condition(condition) => condition_matches(condition, record),
        CriteriaNode::Group(nested_group) => group_matches(nested_group, record),
    };

    match group.logical_mode() {
        LogicalMode::And => {
            for node in group.nodes() {
                if !evaluate(node)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        LogicalMode::Or => {
            for node in group.nodes() {
                if evaluate(node)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

fn condition_matches(condition: &FieldCondition, record: &Record) -> AppResult<bool> {
    let expected = condition.value();
    let Some(stored) = record.field(condition.field()) else {
        return Ok(missing_field_matches(condition.operator(), expected));
    };

    let matches = match condition.operator() {
        CriteriaOperator::Eq => values_equal(stored, expected),
        CriteriaOperator::Neq => !values_equal(stored, expected),
        CriteriaOperator::In => contains_value(expected, stored),
        CriteriaOperator::NotIn => !contains_value(expected, stored),
        CriteriaOperator::Contains => text_matches(stored, expected, |text, needle| {
            text.contains(needle)
        }),
        CriteriaOperator::StartsWith => text_matches(stored, expected, |text, needle| {
            text.starts_with(needle)
        }),
        CriteriaOperator::EndsWith => text_matches(stored, expected, |text, needle| {
            text.ends_with(needle)
        }),
        CriteriaOperator::Gt => compare(condition, stored)?.is_some_and(Ordering::is_gt),
        CriteriaOperator::Gte => compare(condition, stored)?.is_some_and(Ordering::is_ge),
        CriteriaOperator::Lt => compare(condition, stored)?.is_some_and(Ordering::is_lt),
        CriteriaOperator::Lte => compare(condition, stored)?.is_some_and(Ordering::is_le),
    };

    Ok(matches)
}

/// An absent field behaves like `null` for equality and membership and never
/// satisfies text or ordering operators.
fn missing_field_matches(operator: CriteriaOperator, expected: &Value) -> bool {
    match operator {
        CriteriaOperator::Eq => expected.is_null(),
        CriteriaOperator::Neq => !expected.is_null(),
        CriteriaOperator::In => contains_value(expected, &Value::Null),
        CriteriaOperator::NotIn => !contains_value(expected, &Value::Null),
        _ => false,
    }
}

fn values_equal(stored: &Value, expected: &Value) -> bool {
    match (stored, expected) {
        (Value::Number(left), Value::Number(right)) => {
            compare_numbers(left, right).is_some_and(Ordering::is_eq)
        }
        _ => stored == expected,
    }
}

/// Integers compare exactly; floats fall back to `f64`.
fn compare_numbers(left: &Number, right: &Number) -> Option<Ordering> {
    match (exact_integer(left), exact_integer(right)) {
        (Some(left), Some(right)) => Some(left.cmp(&right)),
        _ => left.as_f64()?.partial_cmp(&right.as_f64()?),
    }
}

fn exact_integer(number: &Number) -> Option<i128> {
    number
        .as_i64()
        .map(i128::from)
        .or_else(|| number.as_u64().map(i128::from))
}

fn contains_value(candidates: &Value, stored: &Value) -> bool {
    candidates
        .as_array()
        .is_some_and(|values| values.iter().any(|candidate| values_equal(stored, candidate)))
}

fn text_matches(stored: &Value, expected: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    stored
        .as_str()
        .zip(expected.as_str())
        .is_some_and(|(text, needle)| test(&text.to_lowercase(), &needle.to_lowercase()))
}

fn compare(condition: &FieldCondition, stored: &Value) -> AppResult<Option<Ordering>> {
    match (stored, condition.value()) {
        (Value::Null, _) => Ok(None),
        (Value::Number(left), Value::Number(right)) => Ok(compare_numbers(left, right)),
        (Value::String(left), Value::String(right)) => Ok(Some(left.cmp(right))),
        (stored, expected) => Err(AppError::CriteriaEvaluation(format!(
            "cannot compare field '{}' value {stored} with {expected}",
            condition.field()
        ))),
    }
}
