use tracing::debug;

use crate::domain::entities::pivot::{SortDirection, SortModel};
use crate::query::registry::ColumnRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlOrder {
    pub expr: &'static str,
    pub direction: SortDirection,
    pub tie_break: Option<&'static str>,
}

impl SqlOrder {
    pub fn order_sql(&self) -> String {
        let direction = self.direction.as_sql();
        match self.tie_break {
            Some(key) => format!("{} {direction}, {key} {direction}", self.expr),
            None => format!("{} {direction}", self.expr),
        }
    }
}

/// Ordering from the first sort entry only; the registry key otherwise.
///
/// SQLite places NULLs first in ascending order, so NULL sorts lowest.
pub fn build_order(sort_model: Option<&[SortModel]>, registry: &ColumnRegistry) -> SqlOrder {
    let key = registry.key_expr();
    let default = SqlOrder {
        expr: key,
        direction: SortDirection::Asc,
        tie_break: None,
    };

    let Some(first) = sort_model.and_then(|sorts| sorts.first()) else {
        return default;
    };
    let Some(column) = registry.resolve(&first.col_id) else {
        debug!(col_id = %first.col_id, "unknown sort column, using default order");
        return default;
    };

    SqlOrder {
        expr: column.expr,
        direction: first.direction(),
        tie_break: (column.expr != key).then_some(key),
    }
}
