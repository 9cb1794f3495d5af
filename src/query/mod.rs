//! Server-side row model translation: grid request in, SQL fragments out.

pub mod filter;
pub mod pager;
pub mod registry;
pub mod sort;
pub mod tables;

use crate::domain::entities::pivot::PivotRequest;
use crate::query::filter::{build_filter, SqlFilter};
use crate::query::pager::PageWindow;
use crate::query::registry::ColumnRegistry;
use crate::query::sort::{build_order, SqlOrder};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub filter: SqlFilter,
    pub order: SqlOrder,
    pub window: PageWindow,
}

/// Translates a request against one registry for filtering and sorting.
pub fn translate(request: &PivotRequest, registry: &ColumnRegistry) -> QueryPlan {
    translate_split(request, registry, registry)
}

/// Filters against `source` rows but sorts by `output` columns, as the
/// grouped grid does.
pub fn translate_split(
    request: &PivotRequest,
    source: &ColumnRegistry,
    output: &ColumnRegistry,
) -> QueryPlan {
    QueryPlan {
        filter: build_filter(request.filter_model.as_ref(), source),
        order: build_order(request.sort_model.as_deref(), output),
        window: PageWindow::from_rows(request.start_row, request.end_row),
    }
}
