use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SEARCHES_COLLECTION: &str = "scraper_searches";
pub const RECORDS_COLLECTION: &str = "scraper_records";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperSearch {
    #[serde(default)]
    pub id: i64,
    pub search_name: Option<String>,
    pub filter_used: Option<String>,
    pub fetch_date: Option<DateTime<Utc>>,
    pub success: Option<bool>,
    pub cod_errore: Option<i64>,
    pub message: Option<String>,
    pub debug_message: Option<String>,
    pub total_records: Option<i64>,
    pub records_fetched: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperDataRecord {
    #[serde(default)]
    pub id: i64,
    pub search_id: i64,
    pub has_convenzione_fondo: Option<String>,
    pub raw_content: Option<String>,
    pub extraction_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSummary {
    pub search_id: i64,
    pub search_name: Option<String>,
    pub filter_used: Option<String>,
    pub success: bool,
    pub message: Option<String>,
    pub total_records: i64,
    pub records_fetched: i64,
    pub pages_fetched: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordsRequest {
    #[serde(default)]
    pub ids: Option<Vec<i64>>,
    #[serde(default)]
    pub search_id: Option<i64>,
}
