use std::path::PathBuf;

use rusqlite::Connection;

use crate::domain::entities::keplero::{
    CompareStatistics, FullKeplero, KepleroCompare, ProtocolloGrouped, SecondTable,
};
use crate::domain::entities::pivot::{PageResult, PivotRequest};
use crate::infra::sqlite::queries::{
    count_rows, distinct_values, mismatched_protocols, query_grouped_page, query_page,
    value_histogram,
};
use crate::infra::sqlite::schema::{init_db, open_connection, TableNames};
use crate::query::tables::{Grid, Registries};
use crate::query::{translate, translate_split};
use crate::usecase::ports::repo::{PivotRepository, RepoError};

pub struct SqliteRepo {
    pub db_path: PathBuf,
    pub tables: TableNames,
    pub registries: Registries,
}

impl SqliteRepo {
    pub fn new(db_path: PathBuf, tables: TableNames, registries: Registries) -> Self {
        Self {
            db_path,
            tables,
            registries,
        }
    }

    fn connect(&self) -> Result<Connection, RepoError> {
        open_connection(&self.db_path).map_err(RepoError::from)
    }

    fn table_for(&self, grid: Grid) -> &str {
        match grid {
            Grid::FullKeplero | Grid::ProtocolloGrouped => &self.tables.full_keplero,
            Grid::SecondTable => &self.tables.second_table,
            Grid::KepleroCompare => &self.tables.keplero_compare,
        }
    }
}

impl PivotRepository for SqliteRepo {
    fn init(&self) -> Result<(), RepoError> {
        init_db(&self.db_path, &self.tables).map_err(RepoError::from)
    }

    fn full_keplero_page(
        &self,
        request: &PivotRequest,
    ) -> Result<PageResult<FullKeplero>, RepoError> {
        let plan = translate(request, &self.registries.full_keplero);
        let conn = self.connect()?;
        query_page(&conn, &self.tables.full_keplero, &plan).map_err(RepoError::from)
    }

    fn second_table_page(
        &self,
        request: &PivotRequest,
    ) -> Result<PageResult<SecondTable>, RepoError> {
        let plan = translate(request, &self.registries.second_table);
        let conn = self.connect()?;
        query_page(&conn, &self.tables.second_table, &plan).map_err(RepoError::from)
    }

    fn keplero_compare_page(
        &self,
        request: &PivotRequest,
    ) -> Result<PageResult<KepleroCompare>, RepoError> {
        let plan = translate(request, &self.registries.keplero_compare);
        let conn = self.connect()?;
        query_page(&conn, &self.tables.keplero_compare, &plan).map_err(RepoError::from)
    }

    fn protocollo_grouped_page(
        &self,
        request: &PivotRequest,
    ) -> Result<PageResult<ProtocolloGrouped>, RepoError> {
        let plan = translate_split(
            request,
            &self.registries.full_keplero,
            &self.registries.protocollo_grouped,
        );
        let conn = self.connect()?;
        query_grouped_page(&conn, &self.tables.full_keplero, &plan).map_err(RepoError::from)
    }

    fn compare_statistics(&self) -> Result<CompareStatistics, RepoError> {
        let conn = self.connect()?;
        let table = &self.tables.keplero_compare;

        Ok(CompareStatistics {
            total_records: count_rows(&conn, table)?,
            by_coda: value_histogram(&conn, table, "Coda", "coda")?,
            by_stato_pratica: value_histogram(&conn, table, "StatoPratica", "statoPratica")?,
            by_stato: value_histogram(&conn, table, "Stato", "stato")?,
            by_stato_pratica_keplero: value_histogram(
                &conn,
                table,
                "StatoPratica_Keplero",
                "statoPraticaKeplero",
            )?,
            by_esito: value_histogram(&conn, table, "Esito", "esito")?,
        })
    }

    fn distinct_values(&self, grid: Grid, col_id: &str) -> Result<Vec<String>, RepoError> {
        let registry = match grid {
            Grid::ProtocolloGrouped => &self.registries.full_keplero,
            other => self.registries.get(other),
        };
        let column = registry
            .resolve(col_id)
            .ok_or_else(|| RepoError::UnknownColumn(col_id.to_string()))?;
        let conn = self.connect()?;
        distinct_values(&conn, self.table_for(grid), column.expr).map_err(RepoError::from)
    }

    fn mismatched_protocols(&self) -> Result<Vec<String>, RepoError> {
        let conn = self.connect()?;
        mismatched_protocols(&conn, &self.tables.keplero_compare).map_err(RepoError::from)
    }
}
