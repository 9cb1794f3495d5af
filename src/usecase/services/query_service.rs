use std::sync::Arc;

use crate::domain::entities::keplero::{
    CompareStatistics, FullKeplero, KepleroCompare, ProtocolloGrouped, SecondTable,
};
use crate::domain::entities::pivot::{PageResult, PivotRequest};
use crate::query::tables::Grid;
use crate::usecase::ports::repo::{PivotRepository, RepoError};

/// Grid reads shared by the HTTP handlers.
#[derive(Clone)]
pub struct QueryService {
    repo: Arc<dyn PivotRepository>,
}

impl QueryService {
    pub fn new(repo: Arc<dyn PivotRepository>) -> Self {
        Self { repo }
    }

    pub fn full_keplero(&self, request: &PivotRequest) -> Result<PageResult<FullKeplero>, RepoError> {
        self.repo.full_keplero_page(request)
    }

    pub fn second_table(&self, request: &PivotRequest) -> Result<PageResult<SecondTable>, RepoError> {
        self.repo.second_table_page(request)
    }

    pub fn keplero_compare(
        &self,
        request: &PivotRequest,
    ) -> Result<PageResult<KepleroCompare>, RepoError> {
        self.repo.keplero_compare_page(request)
    }

    pub fn protocollo_grouped(
        &self,
        request: &PivotRequest,
    ) -> Result<PageResult<ProtocolloGrouped>, RepoError> {
        self.repo.protocollo_grouped_page(request)
    }

    pub fn compare_statistics(&self) -> Result<CompareStatistics, RepoError> {
        self.repo.compare_statistics()
    }

    pub fn distinct_values(&self, grid: Grid, col_id: &str) -> Result<Vec<String>, RepoError> {
        self.repo.distinct_values(grid, col_id)
    }

    pub fn mismatched_protocols(&self) -> Result<Vec<String>, RepoError> {
        self.repo.mismatched_protocols()
    }
}
