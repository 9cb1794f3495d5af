pub mod keplero;
pub mod pivot;
pub mod scraper;
