use std::collections::BTreeMap;

use rusqlite::types::Value;
use tracing::debug;

use crate::domain::entities::pivot::FilterModel;
use crate::query::registry::{ColumnDef, ColumnKind, ColumnRegistry};

/// Conjunction of SQL clauses with their positional parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFilter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl SqlFilter {
    pub fn push(&mut self, clause: String, params: impl IntoIterator<Item = Value>) {
        self.clauses.push(clause);
        self.params.extend(params);
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn where_sql(&self) -> String {
        if self.is_empty() {
            "1 = 1".to_string()
        } else {
            self.clauses
                .iter()
                .map(|clause| format!("({clause})"))
                .collect::<Vec<_>>()
                .join(" AND ")
        }
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextOp {
    Contains,
    NotContains,
    Equals,
    NotEqual,
    StartsWith,
    EndsWith,
}

impl TextOp {
    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") | Some("contains") => Some(TextOp::Contains),
            Some("notContains") => Some(TextOp::NotContains),
            Some("equals") => Some(TextOp::Equals),
            Some("notEqual") => Some(TextOp::NotEqual),
            Some("startsWith") => Some(TextOp::StartsWith),
            Some("endsWith") => Some(TextOp::EndsWith),
            Some(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberOp {
    Equals,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl NumberOp {
    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") | Some("equals") => Some(NumberOp::Equals),
            Some("notEqual") => Some(NumberOp::NotEqual),
            Some("lessThan") => Some(NumberOp::LessThan),
            Some("lessThanOrEqual") | Some("lessOrEqual") => Some(NumberOp::LessOrEqual),
            Some("greaterThan") => Some(NumberOp::GreaterThan),
            Some("greaterThanOrEqual") | Some("greaterOrEqual") => {
                Some(NumberOp::GreaterOrEqual)
            }
            Some(_) => None,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            NumberOp::Equals => "=",
            NumberOp::NotEqual => "<>",
            NumberOp::LessThan => "<",
            NumberOp::LessOrEqual => "<=",
            NumberOp::GreaterThan => ">",
            NumberOp::GreaterOrEqual => ">=",
        }
    }
}

/// Builds the AND of one clause per usable filter entry.
///
/// Entries are skipped, never rejected, when the column id is unknown, the
/// filter kind or operator is unsupported, a text value is blank, or a number
/// value does not parse as an integer.
pub fn build_filter(
    filters: Option<&BTreeMap<String, FilterModel>>,
    registry: &ColumnRegistry,
) -> SqlFilter {
    let mut filter = SqlFilter::default();
    let Some(filters) = filters else {
        return filter;
    };

    for (col_id, model) in filters {
        let Some(column) = registry.resolve(col_id) else {
            debug!(col_id = %col_id, "skipping filter on unknown column");
            continue;
        };

        let applied = match model.filter_type.as_str() {
            "text" => push_text_clause(&mut filter, column, model),
            "number" => push_number_clause(&mut filter, column, model),
            "set" => push_set_clause(&mut filter, column, model),
            other => {
                debug!(col_id = %col_id, filter_type = %other, "unsupported filter type");
                false
            }
        };

        if !applied {
            debug!(col_id = %col_id, "filter entry dropped");
        }
    }

    filter
}

fn folded_text(expr: &str) -> String {
    format!("lower(CAST({expr} AS TEXT))")
}

fn push_text_clause(filter: &mut SqlFilter, column: &ColumnDef, model: &FilterModel) -> bool {
    let Some(raw) = model.filter_text() else {
        return false;
    };
    if raw.trim().is_empty() {
        return false;
    }
    let Some(op) = TextOp::parse(model.operator.as_deref()) else {
        return false;
    };

    let needle = raw.to_ascii_lowercase();
    let haystack = folded_text(column.expr);
    let expr = column.expr;

    match op {
        TextOp::Contains => filter.push(
            format!("instr({haystack}, ?) > 0"),
            [Value::Text(needle)],
        ),
        TextOp::NotContains => filter.push(
            format!("{expr} IS NOT NULL AND instr({haystack}, ?) = 0"),
            [Value::Text(needle)],
        ),
        TextOp::Equals => filter.push(format!("{haystack} = ?"), [Value::Text(needle)]),
        TextOp::NotEqual => filter.push(
            format!("{expr} IS NOT NULL AND {haystack} <> ?"),
            [Value::Text(needle)],
        ),
        TextOp::StartsWith => filter.push(
            format!("instr({haystack}, ?) = 1"),
            [Value::Text(needle)],
        ),
        TextOp::EndsWith => {
            let len = needle.chars().count() as i64;
            filter.push(
                format!("length({haystack}) >= ? AND substr({haystack}, -?) = ?"),
                [Value::Integer(len), Value::Integer(len), Value::Text(needle)],
            )
        }
    }
    true
}

fn push_number_clause(filter: &mut SqlFilter, column: &ColumnDef, model: &FilterModel) -> bool {
    if column.kind != ColumnKind::Number {
        return false;
    }
    let Some(op) = NumberOp::parse(model.operator.as_deref()) else {
        return false;
    };
    let Some(value) = model.filter_integer() else {
        return false;
    };

    filter.push(
        format!("{} {} ?", column.expr, op.as_sql()),
        [Value::Integer(value)],
    );
    true
}

fn push_set_clause(filter: &mut SqlFilter, column: &ColumnDef, model: &FilterModel) -> bool {
    let Some(values) = model.values.as_ref() else {
        return false;
    };

    let include_null = values.iter().any(Option::is_none);
    let present: Vec<Value> = values
        .iter()
        .flatten()
        .map(|value| Value::Text(value.clone()))
        .collect();

    let mut parts = Vec::new();
    if !present.is_empty() {
        let placeholders = vec!["?"; present.len()].join(", ");
        parts.push(format!("CAST({} AS TEXT) IN ({placeholders})", column.expr));
    }
    if include_null {
        parts.push(format!("{} IS NULL", column.expr));
    }

    if parts.is_empty() {
        // Nothing selected in the set filter.
        filter.push("0 = 1".to_string(), Vec::new());
    } else {
        filter.push(parts.join(" OR "), present);
    }
    true
}
