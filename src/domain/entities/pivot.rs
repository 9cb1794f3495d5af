use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything other than `desc` (in any casing) sorts ascending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortModel {
    #[serde(default)]
    pub col_id: String,
    #[serde(default)]
    pub sort: String,
}

impl SortModel {
    pub fn direction(&self) -> SortDirection {
        SortDirection::parse(&self.sort)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterModel {
    #[serde(default)]
    pub filter_type: String,
    #[serde(default)]
    pub filter: Option<JsonValue>,
    #[serde(default, rename = "type")]
    pub operator: Option<String>,
    #[serde(default)]
    pub values: Option<Vec<Option<String>>>,
}

impl FilterModel {
    /// Filter value as text. Numbers are rendered the way the client sent them.
    pub fn filter_text(&self) -> Option<String> {
        match self.filter.as_ref()? {
            JsonValue::String(text) => Some(text.clone()),
            JsonValue::Number(number) => Some(number.to_string()),
            JsonValue::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    /// Filter value as an integer; `None` when it does not parse.
    pub fn filter_integer(&self) -> Option<i64> {
        match self.filter.as_ref()? {
            JsonValue::String(text) => text.trim().parse::<i64>().ok(),
            JsonValue::Number(number) => number.as_i64(),
            _ => None,
        }
    }
}

#[cfg(test)]
impl FilterModel {
    pub fn text(filter: &str) -> Self {
        Self {
            filter_type: "text".to_string(),
            filter: Some(JsonValue::String(filter.to_string())),
            ..Self::default()
        }
    }

    pub fn number(filter: &str, operator: &str) -> Self {
        Self {
            filter_type: "number".to_string(),
            filter: Some(JsonValue::String(filter.to_string())),
            operator: Some(operator.to_string()),
            values: None,
        }
    }

    pub fn set(values: Vec<Option<String>>) -> Self {
        Self {
            filter_type: "set".to_string(),
            values: Some(values),
            ..Self::default()
        }
    }
}

/// Grid request: half-open window `[start_row, end_row)` plus sort and filter state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotRequest {
    pub start_row: i64,
    pub end_row: i64,
    #[serde(default)]
    pub sort_model: Option<Vec<SortModel>>,
    #[serde(default)]
    pub filter_model: Option<BTreeMap<String, FilterModel>>,
}

#[cfg(test)]
impl PivotRequest {
    pub fn window(start_row: i64, end_row: i64) -> Self {
        Self {
            start_row,
            end_row,
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, col_id: &str, sort: &str) -> Self {
        self.sort_model.get_or_insert_with(Vec::new).push(SortModel {
            col_id: col_id.to_string(),
            sort: sort.to_string(),
        });
        self
    }

    pub fn with_filter(mut self, col_id: &str, filter: FilterModel) -> Self {
        self.filter_model
            .get_or_insert_with(BTreeMap::new)
            .insert(col_id.to_string(), filter);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<R> {
    pub row_data: Vec<R>,
    pub row_count: i64,
}
