//! Label selector handling for component lookup.
//!
//! An Application selector is tri-state: absent selects nothing, present and
//! empty selects everything, otherwise every requirement must hold.

use std::collections::{BTreeMap, BTreeSet};

use kube::core::{Expression, Selector as LabelQuery, SelectorExt};

use crate::crd::{LabelSelector, LabelSelectorRequirement};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("invalid operator {operator:?} for key {key:?}")]
    InvalidOperator { key: String, operator: String },
    #[error("operator {operator} on key {key:?} requires at least one value")]
    MissingValues { key: String, operator: String },
    #[error("operator {operator} on key {key:?} must not carry values")]
    UnexpectedValues { key: String, operator: String },
    #[error("empty label key")]
    EmptyKey,
}

// Stricter than kube's own conversion: Exists/DoesNotExist with values and
// empty keys are rejected the way the API server rejects them.
fn expression(req: &LabelSelectorRequirement) -> Result<Expression, SelectorError> {
    if req.key.is_empty() {
        return Err(SelectorError::EmptyKey);
    }
    let key = req.key.clone();
    let values: BTreeSet<String> = req.values.clone().unwrap_or_default().into_iter().collect();
    match req.operator.as_str() {
        "In" | "NotIn" if values.is_empty() => Err(SelectorError::MissingValues {
            key,
            operator: req.operator.clone(),
        }),
        "Exists" | "DoesNotExist" if !values.is_empty() => Err(SelectorError::UnexpectedValues {
            key,
            operator: req.operator.clone(),
        }),
        "In" => Ok(Expression::In(key, values)),
        "NotIn" => Ok(Expression::NotIn(key, values)),
        "Exists" => Ok(Expression::Exists(key)),
        "DoesNotExist" => Ok(Expression::DoesNotExist(key)),
        other => Err(SelectorError::InvalidOperator {
            key,
            operator: other.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// No selector configured.
    Nothing,
    /// Every expression must hold; no expressions matches everything.
    Matching(LabelQuery),
}

impl Selector {
    pub fn from_label_selector(
        selector: Option<&LabelSelector>,
    ) -> Result<Self, SelectorError> {
        let Some(sel) = selector else {
            return Ok(Selector::Nothing);
        };
        let mut exprs = Vec::new();
        for (k, v) in sel.match_labels.iter().flatten() {
            if k.is_empty() {
                return Err(SelectorError::EmptyKey);
            }
            exprs.push(Expression::Equal(k.clone(), v.clone()));
        }
        for req in sel.match_expressions.iter().flatten() {
            exprs.push(expression(req)?);
        }
        Ok(Selector::Matching(exprs.into_iter().collect()))
    }

    pub fn selects_nothing(&self) -> bool {
        matches!(self, Selector::Nothing)
    }

    pub fn selects_everything(&self) -> bool {
        matches!(self, Selector::Matching(q) if q.selects_all())
    }

    /// The query to send to the API server, `None` when nothing is selected.
    pub fn label_query(&self) -> Option<&LabelQuery> {
        match self {
            Selector::Nothing => None,
            Selector::Matching(q) => Some(q),
        }
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Selector::Nothing => false,
            Selector::Matching(q) => q.matches(labels),
        }
    }

    /// Label query in API server syntax. Empty for match-all; callers must
    /// check `selects_nothing` first since there is no query for "nothing".
    pub fn to_query(&self) -> String {
        self.label_query().map(ToString::to_string).unwrap_or_default()
    }
}
