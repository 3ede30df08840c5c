//! Condition helpers shared by every entity.
//!
//! All id-set predicates go through [`condition_int`]; all substring matches
//! use [`escape_like`] with `!` as the escape character and compare
//! upper-cased values.

use super::predicate::{CompareOp, Predicate, SubQuery};
use monapi_proto::{EvalType, Id, TagFilter, TagOperator};
use std::collections::HashSet;

/// Integer set condition.
///
/// Duplicates are dropped. An empty set matches nothing (everything when
/// negated), one value renders as a comparison, and sets larger than
/// `chunk_size` are split into OR'd `IN` blocks (AND'd `NOT IN` blocks when
/// negated).
pub fn condition_int(column: &str, values: &[i64], negate: bool, chunk_size: usize) -> Predicate {
    let mut seen = HashSet::with_capacity(values.len());
    let unique: Vec<i64> = values.iter().copied().filter(|v| seen.insert(*v)).collect();

    match unique.len() {
        0 => {
            if negate {
                Predicate::True
            } else {
                Predicate::False
            }
        }
        1 => Predicate::int(
            column,
            if negate { CompareOp::Ne } else { CompareOp::Eq },
            unique[0],
        ),
        _ => {
            let blocks: Vec<Predicate> = unique
                .chunks(chunk_size.max(1))
                .map(|chunk| Predicate::InInts {
                    column: column.to_string(),
                    values: chunk.to_vec(),
                    negated: negate,
                })
                .collect();
            if negate {
                Predicate::and(blocks)
            } else {
                Predicate::or(blocks)
            }
        }
    }
}

/// Id set condition. Ids outside the signed 64-bit range cannot be stored and
/// are dropped.
pub fn condition_id(column: &str, ids: &[Id], chunk_size: usize) -> Predicate {
    let values: Vec<i64> = ids.iter().filter_map(|id| i64::try_from(*id).ok()).collect();
    condition_int(column, &values, false, chunk_size)
}

/// String set condition with bound parameters.
pub fn condition_string(column: &str, values: &[String], negate: bool) -> Predicate {
    let mut seen = HashSet::with_capacity(values.len());
    let unique: Vec<String> = values
        .iter()
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect();

    match unique.len() {
        0 => {
            if negate {
                Predicate::True
            } else {
                Predicate::False
            }
        }
        1 => Predicate::param(
            column,
            if negate { CompareOp::Ne } else { CompareOp::Eq },
            unique[0].clone(),
        ),
        _ => Predicate::InStrings {
            column: column.to_string(),
            values: unique,
            negated: negate,
        },
    }
}

/// Escape `LIKE` wildcards with `!`.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '!' | '%' | '_') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring pattern: `%` + upper(escaped) + `%`.
pub fn contains_pattern(value: &str) -> String {
    format!("%{}%", escape_like(value).to_uppercase())
}

/// Search pattern honoring `startSearch` and `searchWildcardsEnabled`.
///
/// With wildcards enabled, `*` becomes `%` and nothing else is added.
pub fn search_pattern(value: &str, start_search: bool, wildcards: bool) -> String {
    let escaped = escape_like(value).to_uppercase();
    if wildcards {
        escaped.replace('*', "%")
    } else if start_search {
        format!("{}%", escaped)
    } else {
        format!("%{}%", escaped)
    }
}

/// Case-insensitive `LIKE` on a column.
pub fn like(column: &str, pattern: String, negated: bool) -> Predicate {
    Predicate::Like {
        column: column.to_string(),
        pattern,
        upper: true,
        negated,
    }
}

/// Where tag rows live relative to the base row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSource {
    /// Tag table.
    pub table: String,
    /// Alias used inside the existence subquery.
    pub alias: String,
    /// Column of the tag table pointing at the base row.
    pub foreign_key: String,
    /// Qualified base column the foreign key matches.
    pub base_column: String,
}

impl TagSource {
    /// Create a tag source.
    pub fn new(
        table: impl Into<String>,
        alias: impl Into<String>,
        foreign_key: impl Into<String>,
        base_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            foreign_key: foreign_key.into(),
            base_column: base_column.into(),
        }
    }
}

/// Tag condition.
///
/// Conditions naming the same tag share one existence subquery whose value
/// checks are OR'd; a `Like` condition with an empty value reduces that tag
/// to an existence check. Per-tag subqueries are AND'd for
/// [`EvalType::And`] and OR'd (parenthesized when more than one) for
/// [`EvalType::Or`].
pub fn tag_condition(source: &TagSource, tags: &[TagFilter], eval: EvalType) -> Predicate {
    // None marks a tag reduced to an existence check.
    let mut groups: Vec<(&str, Option<Vec<Predicate>>)> = Vec::new();
    let value_column = format!("{}.value", source.alias);

    for filter in tags {
        let value_check = match filter.operator {
            TagOperator::Equal => Some(Predicate::param(
                value_column.as_str(),
                CompareOp::Eq,
                filter.value.as_str(),
            )),
            TagOperator::Like if filter.value.is_empty() => None,
            TagOperator::Like => Some(like(&value_column, contains_pattern(&filter.value), false)),
        };

        let position = groups.iter().position(|(tag, _)| *tag == filter.tag);
        match (position, value_check) {
            (Some(i), None) => groups[i].1 = None,
            (Some(i), Some(check)) => {
                if let Some(checks) = groups[i].1.as_mut() {
                    checks.push(check);
                }
            }
            (None, check) => groups.push((filter.tag.as_str(), check.map(|c| vec![c]))),
        }
    }

    let conditions: Vec<Predicate> = groups
        .into_iter()
        .map(|(tag, checks)| {
            let mut parts = vec![
                Predicate::columns_eq(
                    source.base_column.as_str(),
                    format!("{}.{}", source.alias, source.foreign_key),
                ),
                Predicate::param(format!("{}.tag", source.alias), CompareOp::Eq, tag),
            ];
            if let Some(checks) = checks {
                parts.push(Predicate::or(checks));
            }
            Predicate::exists(
                SubQuery::select("NULL", format!("{} {}", source.table, source.alias))
                    .filter(Predicate::and(parts)),
            )
        })
        .collect();

    match eval {
        EvalType::And => Predicate::and(conditions),
        EvalType::Or => Predicate::or(conditions),
    }
}
