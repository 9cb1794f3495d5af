use crate::domain::entities::keplero::{
    CompareStatistics, FullKeplero, KepleroCompare, ProtocolloGrouped, SecondTable,
};
use crate::domain::entities::pivot::{PageResult, PivotRequest};
use crate::query::tables::Grid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    Message(String),
    UnknownColumn(String),
}

impl std::fmt::Display for RepoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoError::Message(message) => write!(f, "{message}"),
            RepoError::UnknownColumn(column) => write!(f, "unknown column: {column}"),
        }
    }
}

impl std::error::Error for RepoError {}

impl From<anyhow::Error> for RepoError {
    fn from(err: anyhow::Error) -> Self {
        RepoError::Message(format!("{err:#}"))
    }
}

/// Read access to the relational tables behind the grids.
pub trait PivotRepository: Send + Sync {
    fn init(&self) -> Result<(), RepoError>;

    fn full_keplero_page(&self, request: &PivotRequest)
        -> Result<PageResult<FullKeplero>, RepoError>;
    fn second_table_page(&self, request: &PivotRequest)
        -> Result<PageResult<SecondTable>, RepoError>;
    fn keplero_compare_page(
        &self,
        request: &PivotRequest,
    ) -> Result<PageResult<KepleroCompare>, RepoError>;
    fn protocollo_grouped_page(
        &self,
        request: &PivotRequest,
    ) -> Result<PageResult<ProtocolloGrouped>, RepoError>;

    fn compare_statistics(&self) -> Result<CompareStatistics, RepoError>;
    fn distinct_values(&self, grid: Grid, col_id: &str) -> Result<Vec<String>, RepoError>;
    fn mismatched_protocols(&self) -> Result<Vec<String>, RepoError>;
}
