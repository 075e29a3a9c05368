//! Where-clause grammar scoping a permission grant to matching records.
//!
//! Clauses are written as JSON objects:
//!
//! - `{"status": "draft"}` compares a field for equality.
//! - `{"status": ["draft", "review"]}` checks membership.
//! - `{"views": {">": 10, "<=": 100}}` applies every listed operator.
//! - `{"or": [{..}, {..}]}` and `{"and": [{..}, {..}]}` group nested clauses.
//!
//! Sibling keys of one object are combined with logical AND.

use rowguard_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Comparison applied between a record field and a clause value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaOperator {
    /// Equality comparison.
    Eq,
    /// Inequality comparison.
    Neq,
    /// Greater-than comparison.
    Gt,
    /// Greater-than-or-equal comparison.
    Gte,
    /// Less-than comparison.
    Lt,
    /// Less-than-or-equal comparison.
    Lte,
    /// Membership in provided set.
    In,
    /// Absence from provided set.
    NotIn,
    /// Substring match for text values.
    Contains,
    /// Prefix match for text values.
    StartsWith,
    /// Suffix match for text values.
    EndsWith,
}

impl CriteriaOperator {
    /// Resolves an operator key as written inside a field modifier object.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "<" | "lessThan" => Some(Self::Lt),
            "<=" | "lessThanOrEqual" => Some(Self::Lte),
            ">" | "greaterThan" => Some(Self::Gt),
            ">=" | "greaterThanOrEqual" => Some(Self::Gte),
            "!" | "not" => Some(Self::Neq),
            "in" => Some(Self::In),
            "nin" => Some(Self::NotIn),
            "contains" => Some(Self::Contains),
            "startsWith" => Some(Self::StartsWith),
            "endsWith" => Some(Self::EndsWith),
            _ => None,
        }
    }
}

/// Logical mode for condition groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalMode {
    /// All nodes must match.
    And,
    /// Any node may match.
    Or,
}

/// One comparison against a record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCondition {
    field: String,
    operator: CriteriaOperator,
    value: Value,
}

impl FieldCondition {
    /// Returns the record field the condition reads.
    #[must_use]
    pub fn field(&self) -> &str {
        self.field.as_str()
    }

    /// Returns the comparison operator.
    #[must_use]
    pub fn operator(&self) -> CriteriaOperator {
        self.operator
    }

    /// Returns the value compared against.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Node in a condition tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaNode {
    /// Single field comparison.
    Condition(FieldCondition),
    /// Nested group.
    Group(CriteriaGroup),
}

/// Group of nodes combined with one logical mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriteriaGroup {
    logical_mode: LogicalMode,
    nodes: Vec<CriteriaNode>,
}

impl CriteriaGroup {
    /// Returns the group logical mode.
    #[must_use]
    pub fn logical_mode(&self) -> LogicalMode {
        self.logical_mode
    }

    /// Returns the group nodes. An empty `And` group matches every record.
    #[must_use]
    pub fn nodes(&self) -> &[CriteriaNode] {
        &self.nodes
    }
}

/// Parsed and validated where-clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct WhereClause {
    root: CriteriaGroup,
    source: Value,
}

impl WhereClause {
    /// Parses a where-clause from its JSON representation.
    pub fn from_value(source: Value) -> AppResult<Self> {
        let Value::Object(object) = &source else {
            return Err(AppError::Validation(
                "where clause must be a JSON object".to_owned(),
            ));
        };

        let root = parse_object(object)?;
        Ok(Self { root, source })
    }

    /// Returns the root condition group.
    #[must_use]
    pub fn root(&self) -> &CriteriaGroup {
        &self.root
    }

    /// Returns the JSON the clause was parsed from.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.source
    }
}

impl TryFrom<Value> for WhereClause {
    type Error = AppError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<WhereClause> for Value {
    fn from(value: WhereClause) -> Self {
        value.source
    }
}

fn parse_object(object: &Map<String, Value>) -> AppResult<CriteriaGroup> {
    let mut nodes = Vec::with_capacity(object.len());

    for (key, value) in object {
        match key.as_str() {
            "or" => nodes.push(CriteriaNode::Group(parse_logical_group(
                LogicalMode::Or,
                key,
                value,
            )?)),
            "and" => nodes.push(CriteriaNode::Group(parse_logical_group(
                LogicalMode::And,
                key,
                value,
            )?)),
            field => parse_field(field, value, &mut nodes)?,
        }
    }

    Ok(CriteriaGroup {
        logical_mode: LogicalMode::And,
        nodes,
    })
}

fn parse_logical_group(
    logical_mode: LogicalMode,
    key: &str,
    value: &Value,
) -> AppResult<CriteriaGroup> {
    let Some(branches) = value.as_array() else {
        return Err(AppError::Validation(format!(
            "where clause '{key}' must be an array of clauses"
        )));
    };

    if branches.is_empty() {
        return Err(AppError::Validation(format!(
            "where clause '{key}' must include at least one clause"
        )));
    }

    let nodes = branches
        .iter()
        .map(|branch| match branch {
            Value::Object(object) => parse_object(object).map(CriteriaNode::Group),
            _ => Err(AppError::Validation(format!(
                "where clause '{key}' entries must be JSON objects"
            ))),
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(CriteriaGroup {
        logical_mode,
        nodes,
    })
}

fn parse_field(field: &str, value: &Value, nodes: &mut Vec<CriteriaNode>) -> AppResult<()> {
    if field.trim().is_empty() {
        return Err(AppError::Validation(
            "where clause field names must not be empty".to_owned(),
        ));
    }

    match value {
        Value::Array(_) => {
            nodes.push(condition(field, CriteriaOperator::In, value.clone()));
            Ok(())
        }
        Value::Object(modifiers) => {
            if modifiers.is_empty() {
                return Err(AppError::Validation(format!(
                    "where clause for field '{field}' must include at least one operator"
                )));
            }

            for (key, operand) in modifiers {
                let operator = match CriteriaOperator::from_key(key) {
                    // `{"!": [..]}` negates membership.
                    Some(CriteriaOperator::Neq) if operand.is_array() => CriteriaOperator::NotIn,
                    Some(operator) => operator,
                    None => {
                        return Err(AppError::Validation(format!(
                            "unknown where clause operator '{key}' for field '{field}'"
                        )));
                    }
                };
                validate_operand(field, key, operator, operand)?;
                nodes.push(condition(field, operator, operand.clone()));
            }

            Ok(())
        }
        scalar => {
            nodes.push(condition(field, CriteriaOperator::Eq, scalar.clone()));
            Ok(())
        }
    }
}

fn validate_operand(
    field: &str,
    key: &str,
    operator: CriteriaOperator,
    operand: &Value,
) -> AppResult<()> {
    let valid = match operator {
        CriteriaOperator::In | CriteriaOperator::NotIn => operand.is_array(),
        CriteriaOperator::Contains | CriteriaOperator::StartsWith | CriteriaOperator::EndsWith => {
            operand.is_string()
        }
        CriteriaOperator::Gt
        | CriteriaOperator::Gte
        | CriteriaOperator::Lt
        | CriteriaOperator::Lte => operand.is_number() || operand.is_string(),
        CriteriaOperator::Eq | CriteriaOperator::Neq => !operand.is_object(),
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "invalid operand for where clause operator '{key}' on field '{field}'"
        )))
    }
}

fn condition(field: &str, operator: CriteriaOperator, value: Value) -> CriteriaNode {
    CriteriaNode::Condition(FieldCondition {
        field: field.to_owned(),
        operator,
        value,
    })
}
