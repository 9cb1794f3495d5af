pub mod import_service;
pub mod query_service;
pub mod scraper_service;
