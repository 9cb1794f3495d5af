use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::{json, Value as JsonValue};

use crate::api::{self, AppState};
use crate::config::ScraperConfig;
use crate::domain::entities::keplero::{FullKeplero, KepleroCompare, ValueCount};
use crate::domain::entities::pivot::{FilterModel, PageResult, PivotRequest};
use crate::domain::entities::scraper::DeleteRecordsRequest;
use crate::infra::http::faschim::FaschimClient;
use crate::infra::import::{load_into_table, TabularData};
use crate::infra::sqlite::documents::SqliteDocumentStore;
use crate::infra::sqlite::repo::SqliteRepo;
use crate::infra::sqlite::schema::{init_db, open_connection, TableNames};
use crate::query::tables::{Grid, Registries};
use crate::usecase::ports::documents::DocumentStore;
use crate::usecase::ports::repo::{PivotRepository, RepoError};
use crate::usecase::services::import_service::ImportService;
use crate::usecase::services::query_service::QueryService;
use crate::usecase::services::scraper_service::ScraperService;

fn unique_test_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("keplero-{prefix}-{nanos}"))
}

fn table(columns: &[&str], rows: &[&[&str]]) -> TabularData {
    TabularData {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
    }
}

fn compare_fixture() -> TabularData {
    table(
        &[
            "Protocollo",
            "ItemId",
            "Coda",
            "StatoPratica",
            "Stato",
            "Esito",
            "DataEsito",
            "StatoPratica_Keplero",
            "Riga",
        ],
        &[
            &["P001", "5", "Q1", "Chiusa", "OK", "Positivo", "2024-01-10", "Chiusa", "1"],
            &["P002", "7", "Q1", "Aperta", "KO", "Negativo", "2024-01-11", "Chiusa", "2"],
            &["P003", "8", "Q2", "chiusa", "OK", "", "2024-01-12", "CHIUSA ", "3"],
            &["P004", "12", "", "In lavorazione", "OK", "Positivo", "03/02/2024", "In lavorazione", "4"],
            &["P005", "", "Q2", "Chiusa definitiva", "KO", "Negativo", "", "Aperta", ""],
        ],
    )
}

fn full_keplero_fixture() -> TabularData {
    table(
        &[
            "NumeroProtocollo",
            "UtenteLiquidatore",
            "DataPresentazione",
            "StatoPratica",
            "FormaAssistenza",
            "CognomePersona",
        ],
        &[
            &["A", "mario", "2024-01-01", "Aperta", "Diretta", "Rossi"],
            &["A", "luigi", "2024-01-02", "Chiusa", "Indiretta", "Bianchi"],
            &["B", "", "2024-01-03", "Chiusa", "Diretta", "Verdi"],
            &["C", "anna", "2024-01-04", "Aperta", "Diretta", "Neri"],
            &["C", "", "2024-01-05", "Aperta", "Rimborso", "Neri"],
            &["C", "paolo", "2024-01-06", "Chiusa", "Diretta", "Neri"],
        ],
    )
}

fn second_table_fixture() -> TabularData {
    table(
        &["Codice", "Descrizione", "Categoria", "Quantita", "DataRiferimento"],
        &[
            &["X1", "Visita", "Sanitaria", "3", "2024-03-01"],
            &["X2", "Ricovero", "Ospedaliera", "1", "2024-01-15"],
            &["X3", "Esame", "Sanitaria", "10", "2024-02-20"],
        ],
    )
}

/// Creates a database with every table seeded from the fixtures above.
fn seed_repo(prefix: &str) -> (PathBuf, SqliteRepo) {
    let temp_dir = unique_test_dir(prefix);
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("keplero.sqlite");

    let tables = TableNames::default();
    let repo = SqliteRepo::new(db_path.clone(), tables.clone(), Registries::default());
    repo.init().expect("repo init should succeed");

    let mut conn = open_connection(&db_path).expect("should open sqlite db");
    load_into_table(&mut conn, &tables.keplero_compare, &compare_fixture(), false)
        .expect("compare fixture should load");
    load_into_table(&mut conn, &tables.full_keplero, &full_keplero_fixture(), false)
        .expect("full keplero fixture should load");
    load_into_table(&mut conn, &tables.second_table, &second_table_fixture(), false)
        .expect("second table fixture should load");

    (temp_dir, repo)
}

fn everything() -> PivotRequest {
    PivotRequest::window(0, 100)
}

fn protocols(page: &PageResult<KepleroCompare>) -> Vec<String> {
    page.row_data.iter().map(|row| row.protocollo.clone()).collect()
}

fn ids(page: &PageResult<FullKeplero>) -> Vec<i64> {
    page.row_data.iter().map(|row| row.id).collect()
}

#[test]
fn init_db_creates_required_tables() {
    let temp_dir = unique_test_dir("init-db");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("keplero.sqlite");

    let result = init_db(&db_path, &TableNames::default());

    assert!(result.is_ok(), "init_db should succeed: {result:?}");

    let conn = Connection::open(&db_path).expect("should open sqlite db");
    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('FullKeplero','SecondTable','keplero_compare')",
            [],
            |row| row.get(0),
        )
        .expect("table count query should succeed");

    assert_eq!(table_count, 3, "required tables should exist");

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn text_filter_matches_regardless_of_case() {
    let (temp_dir, repo) = seed_repo("text-filter");

    let request = everything().with_filter("statoPratica", FilterModel::text("chiusa"));
    let page = repo
        .keplero_compare_page(&request)
        .expect("filtered query should succeed");

    assert_eq!(page.row_count, 3);
    assert_eq!(protocols(&page), vec!["P001", "P003", "P005"]);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn number_filter_greater_than_is_strict() {
    let (temp_dir, repo) = seed_repo("number-filter");

    let request =
        everything().with_filter("itemId", FilterModel::number("7", "greaterThan"));
    let page = repo
        .keplero_compare_page(&request)
        .expect("filtered query should succeed");

    let item_ids: Vec<Option<i64>> = page.row_data.iter().map(|row| row.item_id).collect();
    assert_eq!(item_ids, vec![Some(8), Some(12)]);

    let unparsable = everything().with_filter("itemId", FilterModel::number("abc", "equals"));
    let page = repo
        .keplero_compare_page(&unparsable)
        .expect("unparsable number should be ignored");
    assert_eq!(page.row_count, 5);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn set_filter_includes_null_members() {
    let (temp_dir, repo) = seed_repo("set-filter");

    let request = everything().with_filter(
        "esito",
        FilterModel::set(vec![Some("Positivo".to_string()), None]),
    );
    let page = repo
        .keplero_compare_page(&request)
        .expect("set filter should succeed");

    assert_eq!(protocols(&page), vec!["P001", "P003", "P004"]);

    let empty = everything().with_filter("esito", FilterModel::set(Vec::new()));
    let page = repo
        .keplero_compare_page(&empty)
        .expect("empty set filter should succeed");
    assert_eq!(page.row_count, 0);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn combined_filters_equal_intersection_of_each() {
    let (temp_dir, repo) = seed_repo("and-filters");

    let by_stato = everything().with_filter("statoPratica", FilterModel::text("chiusa"));
    let by_coda =
        everything().with_filter("coda", FilterModel::set(vec![Some("Q2".to_string())]));
    let both = by_stato
        .clone()
        .with_filter("coda", FilterModel::set(vec![Some("Q2".to_string())]));

    let left: BTreeSet<String> = protocols(&repo.keplero_compare_page(&by_stato).expect("query"))
        .into_iter()
        .collect();
    let right: BTreeSet<String> = protocols(&repo.keplero_compare_page(&by_coda).expect("query"))
        .into_iter()
        .collect();
    let combined = repo
        .keplero_compare_page(&both)
        .expect("combined query should succeed");

    let expected: Vec<String> = left.intersection(&right).cloned().collect();
    assert_eq!(combined.row_count, expected.len() as i64);
    assert_eq!(protocols(&combined), expected);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn unknown_columns_fall_back_to_default_result() {
    let (temp_dir, repo) = seed_repo("unknown-columns");

    let baseline = repo
        .keplero_compare_page(&everything())
        .expect("baseline should succeed");
    let request = everything()
        .with_filter("doesNotExist", FilterModel::text("x"))
        .with_sort("alsoMissing", "desc");
    let page = repo
        .keplero_compare_page(&request)
        .expect("unknown columns should be ignored");

    assert_eq!(page, baseline);
    assert_eq!(protocols(&page), vec!["P001", "P002", "P003", "P004", "P005"]);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn compare_grid_accepts_any_id_casing() {
    let (temp_dir, repo) = seed_repo("compare-casing");

    let request = everything()
        .with_filter("STATOPRATICA", FilterModel::text("aperta"))
        .with_sort("Protocollo", "desc");
    let page = repo
        .keplero_compare_page(&request)
        .expect("casing-insensitive lookup should succeed");
    assert_eq!(protocols(&page), vec!["P002"]);

    let full = repo
        .full_keplero_page(&everything().with_filter("STATOPRATICA", FilterModel::text("aperta")))
        .expect("exact lookup should succeed");
    assert_eq!(full.row_count, 6, "exact grids ignore mis-cased ids");

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn window_length_is_clamped_to_total() {
    let (temp_dir, repo) = seed_repo("window");

    for (start, end, expected) in [(0, 2, 2), (4, 10, 2), (6, 8, 0), (3, 1, 0), (-5, 2, 2)] {
        let page = repo
            .full_keplero_page(&PivotRequest::window(start, end))
            .expect("window query should succeed");
        assert_eq!(page.row_count, 6);
        assert_eq!(
            page.row_data.len(),
            expected,
            "window [{start}, {end}) should yield {expected} rows"
        );
    }

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn repeated_requests_return_identical_pages() {
    let (temp_dir, repo) = seed_repo("idempotent");

    let request = PivotRequest::window(1, 4)
        .with_sort("statoPratica", "asc")
        .with_filter("formaAssistenza", FilterModel::text("dire"));
    let first = repo.full_keplero_page(&request).expect("first query");
    let second = repo.full_keplero_page(&request).expect("second query");

    assert_eq!(first, second);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn descending_sort_reverses_ascending_even_with_ties() {
    let (temp_dir, repo) = seed_repo("sort-reverse");

    let ascending = repo
        .full_keplero_page(&everything().with_sort("cognomePersona", "asc"))
        .expect("ascending query");
    let descending = repo
        .full_keplero_page(&everything().with_sort("cognomePersona", "DESC"))
        .expect("descending query");

    let mut reversed = ids(&ascending);
    reversed.reverse();
    assert_eq!(ids(&descending), reversed);
    assert_eq!(ascending.row_data[0].cognome_persona, "Bianchi");

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn grouped_rows_count_source_rows_per_protocol() {
    let (temp_dir, repo) = seed_repo("grouped");

    let page = repo
        .protocollo_grouped_page(&everything())
        .expect("grouped query should succeed");

    assert_eq!(page.row_count, 3, "one group per distinct protocol");
    let total: i64 = page.row_data.iter().map(|row| row.count).sum();
    assert_eq!(total, 6, "group counts should cover every source row");

    let group_a = &page.row_data[0];
    assert_eq!(group_a.numero_protocollo, "A");
    assert_eq!(group_a.count, 2);
    assert_eq!(group_a.utente_liquidatore.as_deref(), Some("mario"));
    assert_eq!(group_a.stato_pratica, "Aperta");

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn grouped_rows_filter_source_and_sort_output() {
    let (temp_dir, repo) = seed_repo("grouped-filter");

    let request = everything()
        .with_filter("statoPratica", FilterModel::text("chiusa"))
        .with_sort("count", "desc");
    let page = repo
        .protocollo_grouped_page(&request)
        .expect("grouped query should succeed");

    let filtered = repo
        .full_keplero_page(&everything().with_filter("statoPratica", FilterModel::text("chiusa")))
        .expect("source query should succeed");
    let total: i64 = page.row_data.iter().map(|row| row.count).sum();
    assert_eq!(total, filtered.row_count);

    let keys: Vec<&str> = page
        .row_data
        .iter()
        .map(|row| row.numero_protocollo.as_str())
        .collect();
    assert_eq!(keys, vec!["C", "B", "A"], "equal counts tie-break on protocol");
    assert_eq!(page.row_data[0].utente_liquidatore.as_deref(), Some("paolo"));

    let by_count = repo
        .protocollo_grouped_page(&everything().with_sort("count", "desc"))
        .expect("grouped sort should succeed");
    assert_eq!(by_count.row_data[0].numero_protocollo, "C");
    assert_eq!(by_count.row_data[0].count, 3);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn second_table_supports_number_filter_and_date_sort() {
    let (temp_dir, repo) = seed_repo("second-table");

    let request = everything()
        .with_filter("quantita", FilterModel::number("3", "greaterThanOrEqual"))
        .with_sort("dataRiferimento", "asc");
    let page = repo
        .second_table_page(&request)
        .expect("second table query should succeed");

    let codes: Vec<&str> = page.row_data.iter().map(|row| row.codice.as_str()).collect();
    assert_eq!(codes, vec!["X3", "X1"]);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn statistics_histograms_are_ordered_by_frequency() {
    let (temp_dir, repo) = seed_repo("statistics");

    let stats = repo
        .compare_statistics()
        .expect("statistics should succeed");

    assert_eq!(stats.total_records, 5);
    assert_eq!(
        stats.by_coda.buckets,
        vec![
            ValueCount { value: "Q1".to_string(), count: 2 },
            ValueCount { value: "Q2".to_string(), count: 2 },
            ValueCount { value: "N/A".to_string(), count: 1 },
        ]
    );
    assert_eq!(stats.by_esito.buckets[2].value, "N/A");

    let encoded = serde_json::to_value(&stats).expect("statistics should serialize");
    assert_eq!(encoded["totalRecords"], 5);
    assert_eq!(encoded["byCoda"][0], json!({"coda": "Q1", "count": 2}));
    assert_eq!(
        encoded["byStatoPraticaKeplero"][0],
        json!({"statoPraticaKeplero": "Chiusa", "count": 2})
    );

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn statistics_keep_null_apart_from_literal_placeholder() {
    let (temp_dir, repo) = seed_repo("statistics-placeholder");
    let conn = open_connection(&temp_dir.join("keplero.sqlite")).expect("should open sqlite db");
    conn.execute(
        "UPDATE keplero_compare SET Coda = 'N/A' WHERE Protocollo = 'P001'",
        [],
    )
    .expect("update should succeed");

    let stats = repo
        .compare_statistics()
        .expect("statistics should succeed");

    assert_eq!(
        stats.by_coda.buckets,
        vec![
            ValueCount { value: "Q2".to_string(), count: 2 },
            ValueCount { value: "N/A".to_string(), count: 1 },
            ValueCount { value: "Q1".to_string(), count: 1 },
            ValueCount { value: "N/A".to_string(), count: 1 },
        ]
    );
    let counted: i64 = stats.by_coda.buckets.iter().map(|bucket| bucket.count).sum();
    assert_eq!(counted, stats.total_records);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn compare_rows_read_loosely_formatted_data_esito() {
    let (temp_dir, repo) = seed_repo("data-esito-text");
    let conn = open_connection(&temp_dir.join("keplero.sqlite")).expect("should open sqlite db");
    conn.execute(
        "UPDATE keplero_compare SET DataEsito = '2024-01-10' WHERE Protocollo = 'P001'",
        [],
    )
    .expect("update should succeed");
    conn.execute(
        "UPDATE keplero_compare SET DataEsito = 'not a date' WHERE Protocollo = 'P002'",
        [],
    )
    .expect("update should succeed");

    let page = repo
        .keplero_compare_page(&everything().with_sort("protocollo", "asc"))
        .expect("page with text dates should still load");

    let midnight = NaiveDate::from_ymd_opt(2024, 1, 10)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("valid date");
    assert_eq!(page.row_data[0].data_esito, Some(midnight));
    assert_eq!(page.row_data[1].data_esito, None);
    assert_eq!(page.row_count, 5);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn distinct_values_skip_blanks_and_sort() {
    let (temp_dir, repo) = seed_repo("distinct-values");

    assert_eq!(
        repo.distinct_values(Grid::KepleroCompare, "coda")
            .expect("coda values"),
        vec!["Q1", "Q2"]
    );
    assert_eq!(
        repo.distinct_values(Grid::FullKeplero, "utenteLiquidatore")
            .expect("liquidatore values"),
        vec!["anna", "luigi", "mario", "paolo"]
    );
    assert_eq!(
        repo.distinct_values(Grid::SecondTable, "categoria")
            .expect("categoria values"),
        vec!["Ospedaliera", "Sanitaria"]
    );
    assert_eq!(
        repo.distinct_values(Grid::FullKeplero, "nope"),
        Err(RepoError::UnknownColumn("nope".to_string()))
    );

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn mismatch_report_ignores_case_and_padding() {
    let (temp_dir, repo) = seed_repo("mismatch");

    let mismatched = repo
        .mismatched_protocols()
        .expect("mismatch query should succeed");

    assert_eq!(mismatched, vec!["P002", "P005"]);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn csv_import_matches_headers_and_replaces() {
    let temp_dir = unique_test_dir("csv-import");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("keplero.sqlite");
    let csv_path = temp_dir.join("compare.csv");
    fs::write(
        &csv_path,
        "\u{feff}protocollo,itemid,Stato,Extra\nK1,3,OK,x\nK2,,KO,y\n\n",
    )
    .expect("should write csv");

    let service = ImportService::new(db_path.clone(), TableNames::default());
    let result = service
        .import_file(Grid::KepleroCompare, &csv_path, None, false)
        .expect("csv import should succeed");

    assert_eq!(result.row_count, 2);
    assert_eq!(result.skipped_headers, vec!["Extra".to_string()]);

    let again = service
        .import_file(Grid::KepleroCompare, &csv_path, None, true)
        .expect("replacing import should succeed");
    assert_eq!(again.row_count, 2);

    let repo = SqliteRepo::new(db_path, TableNames::default(), Registries::default());
    let page = repo
        .keplero_compare_page(&everything())
        .expect("imported rows should be queryable");
    assert_eq!(page.row_count, 2);
    assert_eq!(page.row_data[0].item_id, Some(3));
    assert_eq!(page.row_data[1].item_id, None);

    assert!(service
        .import_file(Grid::ProtocolloGrouped, &csv_path, None, false)
        .is_err());

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

async fn spawn_router(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind test listener");
    let addr = listener.local_addr().expect("listener should have address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("test server should run");
    });
    addr
}

const PORTAL_SESSION: &str = "portal_session=s3ss10n";

/// Fake portal serving `items` in pages behind a cookie session.
/// The optional pages fail with an error body or with HTTP 500.
#[derive(Clone, Default)]
struct FakePortal {
    items: Arc<Vec<JsonValue>>,
    fail_page: Option<u32>,
    broken_page: Option<u32>,
    reject_login: bool,
}

impl FakePortal {
    fn serving(items: Vec<JsonValue>) -> Self {
        Self {
            items: Arc::new(items),
            ..Self::default()
        }
    }

    fn router(self) -> Router {
        Router::new()
            .route("/login", post(fake_login))
            .route("/api/pratiche", get(fake_pratiche))
            .with_state(self)
    }
}

async fn fake_login(State(portal): State<FakePortal>) -> Response {
    if portal.reject_login {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    (
        StatusCode::OK,
        [(header::SET_COOKIE, format!("{PORTAL_SESSION}; Path=/"))],
    )
        .into_response()
}

async fn fake_pratiche(
    State(portal): State<FakePortal>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<JsonValue>, StatusCode> {
    let has_session = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|cookies| cookies.split(';').any(|cookie| cookie.trim() == PORTAL_SESSION));
    if !has_session {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let page: u32 = params
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);
    let size: usize = params
        .get("pageSize")
        .and_then(|p| p.parse().ok())
        .unwrap_or(10);

    if portal.broken_page == Some(page) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    if portal.fail_page == Some(page) {
        return Ok(Json(json!({
            "success": false,
            "codErrore": 42,
            "message": "sessione scaduta",
            "debugMessage": "token expired",
        })));
    }

    let start = (page as usize - 1) * size;
    let data: Vec<JsonValue> = portal.items.iter().skip(start).take(size).cloned().collect();
    Ok(Json(json!({
        "success": true,
        "totalRecords": portal.items.len(),
        "data": data,
    })))
}

fn portal_items(count: usize) -> Vec<JsonValue> {
    (0..count)
        .map(|idx| json!({"protocollo": format!("F{idx}"), "hasConvenzioneFondo": idx % 2 == 0}))
        .collect()
}

async fn scraper_for(addr: SocketAddr) -> ScraperService {
    let config = ScraperConfig {
        base_url: format!("http://{addr}"),
        page_size: 2,
        page_delay_ms: 0,
        ..ScraperConfig::default()
    };
    let client = FaschimClient::new(config).expect("client should build");
    let store: Arc<dyn DocumentStore> =
        Arc::new(SqliteDocumentStore::open_in_memory().expect("store should open"));
    ScraperService::new(client, store)
}

#[tokio::test]
async fn scraper_pages_until_total_and_stores_records() {
    let addr = spawn_router(FakePortal::serving(portal_items(5)).router()).await;
    let scraper = scraper_for(addr).await;

    let summary = scraper
        .fetch(Some("anno=2024".to_string()), Some("gennaio".to_string()))
        .await
        .expect("fetch should succeed");

    assert!(summary.success);
    assert_eq!(summary.total_records, 5);
    assert_eq!(summary.records_fetched, 5);
    assert_eq!(summary.pages_fetched, 3);

    let searches = scraper.list_searches().expect("searches should list");
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].id, summary.search_id);
    assert_eq!(searches[0].filter_used.as_deref(), Some("anno=2024"));
    assert_eq!(searches[0].success, Some(true));

    let records = scraper
        .list_records(Some(summary.search_id))
        .expect("records should list");
    assert_eq!(records.len(), 5);
    assert_eq!(records[0].has_convenzione_fondo.as_deref(), Some("true"));
    assert_eq!(records[1].has_convenzione_fondo.as_deref(), Some("false"));

    let deleted = scraper
        .delete_records(&DeleteRecordsRequest {
            ids: Some(vec![records[0].id]),
            search_id: None,
        })
        .expect("delete by id should succeed");
    assert_eq!(deleted, 1);

    let deleted = scraper
        .delete_records(&DeleteRecordsRequest {
            ids: None,
            search_id: Some(summary.search_id),
        })
        .expect("delete by search should succeed");
    assert_eq!(deleted, 4);
    assert!(scraper
        .list_records(None)
        .expect("records should list")
        .is_empty());
}

#[tokio::test]
async fn scraper_records_upstream_failure_and_stops() {
    let addr = spawn_router(FakePortal {
        fail_page: Some(2),
        ..FakePortal::serving(portal_items(5))
    }
    .router()).await;
    let scraper = scraper_for(addr).await;

    let summary = scraper
        .fetch(None, Some("fallita".to_string()))
        .await
        .expect("upstream failure body should still produce a summary");

    assert!(!summary.success);
    assert_eq!(summary.records_fetched, 2);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.message.as_deref(), Some("sessione scaduta"));

    let searches = scraper.list_searches().expect("searches should list");
    assert_eq!(searches[0].cod_errore, Some(42));
    assert_eq!(searches[0].debug_message.as_deref(), Some("token expired"));
}

#[tokio::test]
async fn scraper_aborts_on_http_error_without_storing() {
    let addr = spawn_router(FakePortal {
        broken_page: Some(2),
        ..FakePortal::serving(portal_items(5))
    }
    .router()).await;
    let scraper = scraper_for(addr).await;

    let result = scraper.fetch(None, None).await;

    assert!(result.is_err(), "HTTP 500 should abort the fetch");
    assert!(scraper.list_searches().expect("searches").is_empty());
    assert!(scraper.list_records(None).expect("records").is_empty());
}

#[tokio::test]
async fn scraper_aborts_when_login_rejected() {
    let addr = spawn_router(
        FakePortal {
            reject_login: true,
            ..FakePortal::serving(portal_items(3))
        }
        .router(),
    )
    .await;
    let scraper = scraper_for(addr).await;

    let result = scraper.fetch(None, Some("login".to_string())).await;

    assert!(result.is_err(), "a rejected login should abort the fetch");
    assert!(scraper.list_searches().expect("searches").is_empty());
    assert!(scraper.list_records(None).expect("records").is_empty());
}

#[tokio::test]
async fn portal_pages_require_the_login_session() {
    let addr = spawn_router(FakePortal::serving(portal_items(3)).router()).await;
    let config = ScraperConfig {
        base_url: format!("http://{addr}"),
        page_size: 2,
        page_delay_ms: 0,
        ..ScraperConfig::default()
    };
    let client = FaschimClient::new(config).expect("client should build");

    assert!(
        client.fetch_page("", 1).await.is_err(),
        "pages without a session should be refused"
    );

    client.login().await.expect("login should succeed");
    let page = client
        .fetch_page("", 1)
        .await
        .expect("session cookie should be reused");
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.total_records, Some(3));
}

#[tokio::test]
async fn api_serves_grids_and_reports_problems() {
    let (temp_dir, repo) = seed_repo("api");
    let upstream = spawn_router(FakePortal::serving(portal_items(3)).router()).await;
    let state = AppState {
        query: QueryService::new(Arc::new(repo)),
        scraper: Arc::new(scraper_for(upstream).await),
    };
    let addr = spawn_router(api::router(state, &["http://localhost:5173".to_string()])).await;
    let http = reqwest::Client::new();
    let base = format!("http://{addr}/api");

    let health: JsonValue = http
        .get(format!("{base}/health"))
        .send()
        .await
        .expect("health request")
        .json()
        .await
        .expect("health body");
    assert_eq!(health["status"], "healthy");

    let page: JsonValue = http
        .post(format!("{base}/keplero-compare"))
        .json(&json!({
            "startRow": 0,
            "endRow": 2,
            "sortModel": [{"colId": "itemId", "sort": "desc"}],
            "filterModel": {"statoPratica": {"filterType": "text", "filter": "chiusa"}},
        }))
        .send()
        .await
        .expect("grid request")
        .json()
        .await
        .expect("grid body");
    assert_eq!(page["rowCount"], 3);
    assert_eq!(page["rowData"][0]["protocollo"], "P003");
    assert_eq!(page["rowData"].as_array().map(Vec::len), Some(2));

    let grouped: JsonValue = http
        .post(format!("{base}/pivot-data-grouped"))
        .json(&json!({"startRow": 0, "endRow": 1}))
        .send()
        .await
        .expect("grouped request")
        .json()
        .await
        .expect("grouped body");
    assert_eq!(grouped["rowData"][0], json!({
        "numeroProtocollo": "A",
        "count": 2,
        "utenteLiquidatore": "mario",
        "dataPresentazione": "2024-01-01",
        "statoPratica": "Aperta",
        "formaAssistenza": "Diretta",
    }));

    let values: Vec<String> = http
        .get(format!("{base}/keplero-compare/esito-values"))
        .send()
        .await
        .expect("values request")
        .json()
        .await
        .expect("values body");
    assert_eq!(values, vec!["Negativo", "Positivo"]);

    let summary: JsonValue = http
        .get(format!("{base}/scraper/fetch-from-faschim?filter=x&searchName=api"))
        .send()
        .await
        .expect("fetch request")
        .json()
        .await
        .expect("fetch body");
    assert_eq!(summary["recordsFetched"], 3);

    let deleted: JsonValue = http
        .post(format!("{base}/scraper/data/delete"))
        .json(&json!({"searchId": summary["searchId"]}))
        .send()
        .await
        .expect("delete request")
        .json()
        .await
        .expect("delete body");
    assert_eq!(deleted["deleted"], 3);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");

    let broken = SqliteRepo::new(
        unique_test_dir("api-missing").join("missing.sqlite"),
        TableNames::default(),
        Registries::default(),
    );
    let state = AppState {
        query: QueryService::new(Arc::new(broken)),
        scraper: Arc::new(scraper_for(upstream).await),
    };
    let addr = spawn_router(api::router(state, &[])).await;
    let response = http
        .post(format!("http://{addr}/api/pivot-data"))
        .json(&json!({"startRow": 0, "endRow": 10}))
        .send()
        .await
        .expect("failing request");
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let problem: JsonValue = response.json().await.expect("problem body");
    assert_eq!(problem["status"], 500);
    assert!(problem["detail"].as_str().is_some_and(|d| !d.is_empty()));
}
