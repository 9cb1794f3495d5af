use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Number,
    Date,
}

/// How a request's column id is matched against the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnMatching {
    #[default]
    Exact,
    IgnoreCase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub id: &'static str,
    pub expr: &'static str,
    pub kind: ColumnKind,
}

impl ColumnDef {
    pub const fn text(id: &'static str, expr: &'static str) -> Self {
        Self {
            id,
            expr,
            kind: ColumnKind::Text,
        }
    }

    pub const fn number(id: &'static str, expr: &'static str) -> Self {
        Self {
            id,
            expr,
            kind: ColumnKind::Number,
        }
    }

    pub const fn date(id: &'static str, expr: &'static str) -> Self {
        Self {
            id,
            expr,
            kind: ColumnKind::Date,
        }
    }
}

/// Fixed mapping from grid column ids to SQL expressions for one row type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRegistry {
    columns: &'static [ColumnDef],
    key: &'static str,
    matching: ColumnMatching,
}

impl ColumnRegistry {
    pub const fn new(columns: &'static [ColumnDef], key: &'static str) -> Self {
        Self {
            columns,
            key,
            matching: ColumnMatching::Exact,
        }
    }

    pub fn with_matching(mut self, matching: ColumnMatching) -> Self {
        self.matching = matching;
        self
    }

    /// Primary-key expression, used as the default sort and as tie-break.
    pub fn key_expr(&self) -> &'static str {
        self.key
    }

    pub fn resolve(&self, id: &str) -> Option<&'static ColumnDef> {
        let columns: &'static [ColumnDef] = self.columns;
        match self.matching {
            ColumnMatching::Exact => columns.iter().find(|column| column.id == id),
            ColumnMatching::IgnoreCase => columns
                .iter()
                .find(|column| column.id.eq_ignore_ascii_case(id)),
        }
    }
}
