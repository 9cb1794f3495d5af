//! HTTP surface consumed by the grid front-end. Every route lives under `/api`.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use anyhow::Result;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::usecase::services::query_service::QueryService;
use crate::usecase::services::scraper_service::ScraperService;

#[derive(Clone)]
pub struct AppState {
    pub query: QueryService,
    pub scraper: Arc<ScraperService>,
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/pivot-data", post(handlers::full_keplero))
        .route("/pivot-data-second", post(handlers::second_table))
        .route("/pivot-data-grouped", post(handlers::protocollo_grouped))
        .route("/keplero-compare", post(handlers::keplero_compare))
        .route(
            "/keplero-compare/statistics",
            get(handlers::compare_statistics),
        )
        .route("/keplero-compare/mismatch", get(handlers::compare_mismatch))
        .route("/stato-pratica-values", get(handlers::stato_pratica_values))
        .route(
            "/forma-assistenza-values",
            get(handlers::forma_assistenza_values),
        )
        .route(
            "/utente-liquidatore-values",
            get(handlers::utente_liquidatore_values),
        )
        .route(
            "/second-table/categoria-values",
            get(handlers::categoria_values),
        )
        .route(
            "/keplero-compare/coda-values",
            get(handlers::compare_coda_values),
        )
        .route(
            "/keplero-compare/stato-values",
            get(handlers::compare_stato_values),
        )
        .route(
            "/keplero-compare/esito-values",
            get(handlers::compare_esito_values),
        )
        .route(
            "/keplero-compare/stato-pratica-values",
            get(handlers::compare_stato_pratica_values),
        )
        .route("/scraper/fetch-from-faschim", get(handlers::scraper_fetch))
        .route("/scraper/data", get(handlers::scraper_records))
        .route("/scraper/data/delete", post(handlers::scraper_delete))
        .route("/scraper/searches", get(handlers::scraper_searches))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Serves `router` on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: tokio::net::TcpListener,
    router: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
