use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::domain::entities::scraper::{
    DeleteRecordsRequest, FetchSummary, ScraperDataRecord, ScraperSearch, RECORDS_COLLECTION,
    SEARCHES_COLLECTION,
};
use crate::infra::http::faschim::{FaschimClient, UpstreamPage};
use crate::platform::blocking::run_blocking;
use crate::usecase::ports::documents::{DocumentStore, StoredDocument};
use crate::usecase::ports::repo::RepoError;

pub struct ScraperService {
    client: FaschimClient,
    store: Arc<dyn DocumentStore>,
}

#[derive(Debug, Default)]
struct FetchProgress {
    items: Vec<JsonValue>,
    total_records: Option<i64>,
    pages: u32,
    failure: Option<UpstreamPage>,
}

impl ScraperService {
    pub fn new(client: FaschimClient, store: Arc<dyn DocumentStore>) -> Self {
        Self { client, store }
    }

    /// Logs in, pages through the search, then stores the search and its
    /// records. Any HTTP failure aborts before anything is stored.
    pub async fn fetch(
        &self,
        filter: Option<String>,
        search_name: Option<String>,
    ) -> Result<FetchSummary> {
        let filter_value = filter.clone().unwrap_or_default();
        self.client.login().await?;

        let progress = self.fetch_all_pages(&filter_value).await?;
        let records_fetched = progress.items.len() as i64;
        let total_records = progress.total_records.unwrap_or(records_fetched);
        let fetch_date = Utc::now();

        let search = ScraperSearch {
            id: 0,
            search_name: search_name.clone(),
            filter_used: filter.clone(),
            fetch_date: Some(fetch_date),
            success: Some(progress.failure.is_none()),
            cod_errore: progress.failure.as_ref().and_then(|page| page.cod_errore),
            message: progress.failure.as_ref().and_then(|page| page.message.clone()),
            debug_message: progress
                .failure
                .as_ref()
                .and_then(|page| page.debug_message.clone()),
            total_records: Some(total_records),
            records_fetched: Some(records_fetched),
        };

        let store = Arc::clone(&self.store);
        let items = progress.items;
        let extraction_date = fetch_date.to_rfc3339();
        let search_id = run_blocking(move || -> Result<i64> {
            let body = serde_json::to_value(&search).context("failed to encode search")?;
            let search_id = store.insert(SEARCHES_COLLECTION, body)?;

            let records = items
                .iter()
                .map(|item| {
                    serde_json::to_value(record_from_item(search_id, item, &extraction_date))
                        .context("failed to encode record")
                })
                .collect::<Result<Vec<_>>>()?;
            store.insert_bulk(RECORDS_COLLECTION, records)?;
            Ok(search_id)
        })
        .await??;

        let success = progress.failure.is_none();
        info!(
            search_id,
            records_fetched,
            total_records,
            pages = progress.pages,
            success,
            "upstream fetch finished"
        );

        Ok(FetchSummary {
            search_id,
            search_name,
            filter_used: filter,
            success,
            message: progress.failure.and_then(|page| page.message),
            total_records,
            records_fetched,
            pages_fetched: progress.pages,
        })
    }

    async fn fetch_all_pages(&self, filter: &str) -> Result<FetchProgress> {
        let delay = Duration::from_millis(self.client.config().page_delay_ms);
        let mut progress = FetchProgress::default();
        let mut page = 1_u32;

        loop {
            if page > 1 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let body = self.client.fetch_page(filter, page).await?;
            progress.pages += 1;

            if body.success == Some(false) {
                warn!(page, cod_errore = ?body.cod_errore, message = ?body.message, "upstream reported failure");
                progress.failure = Some(body);
                break;
            }

            if body.total_records.is_some() {
                progress.total_records = body.total_records;
            }
            if body.data.is_empty() {
                break;
            }
            progress.items.extend(body.data);

            let fetched = progress.items.len() as i64;
            if progress.total_records.is_some_and(|total| fetched >= total) {
                break;
            }
            page += 1;
        }

        Ok(progress)
    }

    pub fn list_searches(&self) -> Result<Vec<ScraperSearch>, RepoError> {
        self.store
            .scan(SEARCHES_COLLECTION)?
            .into_iter()
            .map(|doc| {
                decode_with_id::<ScraperSearch>(doc).map(|(id, mut search)| {
                    search.id = id;
                    search
                })
            })
            .collect()
    }

    pub fn list_records(&self, search_id: Option<i64>) -> Result<Vec<ScraperDataRecord>, RepoError> {
        let records = self
            .store
            .scan(RECORDS_COLLECTION)?
            .into_iter()
            .map(|doc| {
                decode_with_id::<ScraperDataRecord>(doc).map(|(id, mut record)| {
                    record.id = id;
                    record
                })
            })
            .collect::<Result<Vec<_>, RepoError>>()?;

        Ok(match search_id {
            Some(search_id) => records
                .into_iter()
                .filter(|record| record.search_id == search_id)
                .collect(),
            None => records,
        })
    }

    pub fn delete_records(&self, request: &DeleteRecordsRequest) -> Result<usize, RepoError> {
        let mut ids = request.ids.clone().unwrap_or_default();
        if let Some(search_id) = request.search_id {
            ids.extend(
                self.list_records(Some(search_id))?
                    .into_iter()
                    .map(|record| record.id),
            );
        }
        ids.sort_unstable();
        ids.dedup();

        if ids.is_empty() {
            return Ok(0);
        }
        self.store.delete(RECORDS_COLLECTION, &ids)
    }
}

fn decode_with_id<T: serde::de::DeserializeOwned>(
    doc: StoredDocument,
) -> Result<(i64, T), RepoError> {
    let value = serde_json::from_value(doc.body)
        .map_err(|err| RepoError::Message(format!("corrupt document #{}: {err}", doc.id)))?;
    Ok((doc.id, value))
}

fn record_from_item(search_id: i64, item: &JsonValue, extraction_date: &str) -> ScraperDataRecord {
    let has_convenzione_fondo = item
        .get("hasConvenzioneFondo")
        .or_else(|| item.get("HasConvenzioneFondo"))
        .and_then(|value| match value {
            JsonValue::Null => None,
            JsonValue::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        });

    ScraperDataRecord {
        id: 0,
        search_id,
        has_convenzione_fondo,
        raw_content: Some(item.to_string()),
        extraction_date: Some(extraction_date.to_string()),
    }
}
