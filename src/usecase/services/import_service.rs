use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::infra::import::csv::read_csv;
use crate::infra::import::xlsx::read_xlsx;
use crate::infra::import::{load_into_table, ImportResult, TabularData};
use crate::infra::sqlite::schema::{init_db, open_connection, TableNames};
use crate::query::tables::Grid;

pub struct ImportService {
    db_path: PathBuf,
    tables: TableNames,
}

impl ImportService {
    pub fn new(db_path: PathBuf, tables: TableNames) -> Self {
        Self { db_path, tables }
    }

    /// Loads a `.csv` or `.xlsx` file into the table behind `grid`.
    pub fn import_file(
        &self,
        grid: Grid,
        path: &Path,
        sheet: Option<&str>,
        replace: bool,
    ) -> Result<ImportResult> {
        let table = match grid {
            Grid::FullKeplero => &self.tables.full_keplero,
            Grid::SecondTable => &self.tables.second_table,
            Grid::KepleroCompare => &self.tables.keplero_compare,
            Grid::ProtocolloGrouped => {
                anyhow::bail!("the grouped grid is derived from FullKeplero and cannot be imported")
            }
        };

        let data = read_tabular(path, sheet)?;
        init_db(&self.db_path, &self.tables)?;
        let mut conn = open_connection(&self.db_path)?;
        let result = load_into_table(&mut conn, table, &data, replace)
            .with_context(|| format!("failed to import {} into {table}", path.display()))?;

        info!(
            table = %result.table,
            rows = result.row_count,
            file = %path.display(),
            "import finished"
        );
        Ok(result)
    }
}

fn read_tabular(path: &Path, sheet: Option<&str>) -> Result<TabularData> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xlsm" | "xls" => read_xlsx(path, sheet),
        other => anyhow::bail!("unsupported import file type: {other:?}"),
    }
}
