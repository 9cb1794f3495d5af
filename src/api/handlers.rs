use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::domain::entities::keplero::{
    CompareStatistics, FullKeplero, KepleroCompare, ProtocolloGrouped, SecondTable,
};
use crate::domain::entities::pivot::{PageResult, PivotRequest};
use crate::domain::entities::scraper::{
    DeleteRecordsRequest, FetchSummary, ScraperDataRecord, ScraperSearch,
};
use crate::platform::blocking::run_blocking;
use crate::query::tables::Grid;

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "healthy",
        timestamp: Utc::now(),
    })
}

pub async fn full_keplero(
    State(state): State<AppState>,
    Json(request): Json<PivotRequest>,
) -> Result<Json<PageResult<FullKeplero>>, ApiError> {
    let query = state.query.clone();
    let page = run_blocking(move || query.full_keplero(&request)).await??;
    Ok(Json(page))
}

pub async fn second_table(
    State(state): State<AppState>,
    Json(request): Json<PivotRequest>,
) -> Result<Json<PageResult<SecondTable>>, ApiError> {
    let query = state.query.clone();
    let page = run_blocking(move || query.second_table(&request)).await??;
    Ok(Json(page))
}

pub async fn protocollo_grouped(
    State(state): State<AppState>,
    Json(request): Json<PivotRequest>,
) -> Result<Json<PageResult<ProtocolloGrouped>>, ApiError> {
    let query = state.query.clone();
    let page = run_blocking(move || query.protocollo_grouped(&request)).await??;
    Ok(Json(page))
}

pub async fn keplero_compare(
    State(state): State<AppState>,
    Json(request): Json<PivotRequest>,
) -> Result<Json<PageResult<KepleroCompare>>, ApiError> {
    let query = state.query.clone();
    let page = run_blocking(move || query.keplero_compare(&request)).await??;
    Ok(Json(page))
}

pub async fn compare_statistics(
    State(state): State<AppState>,
) -> Result<Json<CompareStatistics>, ApiError> {
    let query = state.query.clone();
    let stats = run_blocking(move || query.compare_statistics()).await??;
    Ok(Json(stats))
}

pub async fn compare_mismatch(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let query = state.query.clone();
    let protocols = run_blocking(move || query.mismatched_protocols()).await??;
    Ok(Json(protocols))
}

async fn values(
    state: AppState,
    grid: Grid,
    col_id: &'static str,
) -> Result<Json<Vec<String>>, ApiError> {
    let query = state.query.clone();
    let values = run_blocking(move || query.distinct_values(grid, col_id)).await??;
    Ok(Json(values))
}

pub async fn stato_pratica_values(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    values(state, Grid::FullKeplero, "statoPratica").await
}

pub async fn forma_assistenza_values(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    values(state, Grid::FullKeplero, "formaAssistenza").await
}

pub async fn utente_liquidatore_values(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    values(state, Grid::FullKeplero, "utenteLiquidatore").await
}

pub async fn categoria_values(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    values(state, Grid::SecondTable, "categoria").await
}

pub async fn compare_coda_values(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    values(state, Grid::KepleroCompare, "coda").await
}

pub async fn compare_stato_values(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    values(state, Grid::KepleroCompare, "stato").await
}

pub async fn compare_esito_values(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    values(state, Grid::KepleroCompare, "esito").await
}

pub async fn compare_stato_pratica_values(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    values(state, Grid::KepleroCompare, "statoPratica").await
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchParams {
    filter: Option<String>,
    search_name: Option<String>,
}

pub async fn scraper_fetch(
    State(state): State<AppState>,
    Query(params): Query<FetchParams>,
) -> Result<Json<FetchSummary>, ApiError> {
    info!(filter = ?params.filter, search_name = ?params.search_name, "starting upstream fetch");
    let summary = state
        .scraper
        .fetch(params.filter, params.search_name)
        .await?;
    Ok(Json(summary))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsParams {
    search_id: Option<i64>,
}

pub async fn scraper_records(
    State(state): State<AppState>,
    Query(params): Query<RecordsParams>,
) -> Result<Json<Vec<ScraperDataRecord>>, ApiError> {
    let scraper = state.scraper.clone();
    let records = run_blocking(move || scraper.list_records(params.search_id)).await??;
    Ok(Json(records))
}

pub async fn scraper_searches(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScraperSearch>>, ApiError> {
    let scraper = state.scraper.clone();
    let searches = run_blocking(move || scraper.list_searches()).await??;
    Ok(Json(searches))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: usize,
}

pub async fn scraper_delete(
    State(state): State<AppState>,
    Json(request): Json<DeleteRecordsRequest>,
) -> Result<Json<Deleted>, ApiError> {
    let scraper = state.scraper.clone();
    let deleted = run_blocking(move || scraper.delete_records(&request)).await??;
    info!(deleted, "deleted scraper records");
    Ok(Json(Deleted { deleted }))
}

