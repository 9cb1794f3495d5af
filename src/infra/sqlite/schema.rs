use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// Physical table names; configurable because deployments point the grids at
/// backup copies of the source tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub full_keplero: String,
    pub second_table: String,
    pub keplero_compare: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            full_keplero: "FullKeplero".to_string(),
            second_table: "SecondTable".to_string(),
            keplero_compare: "keplero_compare".to_string(),
        }
    }
}

impl TableNames {
    pub fn validate(&self) -> Result<()> {
        for name in [&self.full_keplero, &self.second_table, &self.keplero_compare] {
            if !is_plain_identifier(name) {
                anyhow::bail!("invalid table name: {name:?}");
            }
        }
        Ok(())
    }
}

pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn open_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open db: {}", db_path.display()))?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .context("failed to set busy timeout")?;
    Ok(conn)
}

pub fn ensure_parent_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent dir: {}", parent.display()))?;
    }
    Ok(())
}

pub fn init_db(db_path: &Path, tables: &TableNames) -> Result<()> {
    tables.validate()?;
    ensure_parent_dir(db_path)?;

    let conn = open_connection(db_path)?;
    let full_keplero = quote_ident(&tables.full_keplero);
    let second_table = quote_ident(&tables.second_table);
    let keplero_compare = quote_ident(&tables.keplero_compare);
    let compare_index_prefix = &tables.keplero_compare;

    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS {full_keplero} (
            Id                       INTEGER PRIMARY KEY AUTOINCREMENT,
            NumeroProtocollo         TEXT NOT NULL,
            UtenteLiquidatore        TEXT,
            DataPresentazione        TEXT NOT NULL DEFAULT '',
            DataInserimento          TEXT NOT NULL DEFAULT '',
            Modified                 TEXT NOT NULL DEFAULT '',
            DescrizioneGruppoTariffa TEXT,
            FormaAssistenza          TEXT NOT NULL DEFAULT '',
            ImportoRichiesto         TEXT,
            ImportoRiconosciuto      TEXT,
            DataPagamento            TEXT,
            CognomePersona           TEXT NOT NULL DEFAULT '',
            NomePersona              TEXT NOT NULL DEFAULT '',
            CognomeBeneficiario      TEXT NOT NULL DEFAULT '',
            NomeBeneficiario         TEXT NOT NULL DEFAULT '',
            UnisalInviato            TEXT,
            StatoPratica             TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS {second_table} (
            Id              INTEGER PRIMARY KEY AUTOINCREMENT,
            Codice          TEXT NOT NULL DEFAULT '',
            Descrizione     TEXT,
            Categoria       TEXT,
            Quantita        INTEGER,
            DataRiferimento TEXT,
            Note            TEXT
        );

        CREATE TABLE IF NOT EXISTS {keplero_compare} (
            Protocollo           TEXT PRIMARY KEY NOT NULL,
            ItemId               INTEGER,
            Coda                 TEXT,
            StatoPratica         TEXT,
            Stato                TEXT,
            Esito                TEXT,
            DataEsito            TEXT,
            StatoPratica_Keplero TEXT NOT NULL DEFAULT '',
            Riga                 INTEGER
        );

        CREATE INDEX IF NOT EXISTS \"idx_{compare_index_prefix}_item_id\"
            ON {keplero_compare}(ItemId);

        CREATE INDEX IF NOT EXISTS \"idx_{compare_index_prefix}_data_esito\"
            ON {keplero_compare}(DataEsito);
        "
    ))
    .context("failed to initialize schema")?;

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    pub decl_type: String,
    pub not_null: bool,
}

/// Physical columns of a table, in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<TableColumn>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))
        .context("failed to prepare table_info")?;
    let columns = stmt
        .query_map([], |row| {
            Ok(TableColumn {
                name: row.get(1)?,
                decl_type: row.get(2)?,
                not_null: row.get::<_, i64>(3)? != 0,
            })
        })
        .context("failed to query table_info")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect table_info")?;

    if columns.is_empty() {
        anyhow::bail!("table not found: {table}");
    }
    Ok(columns)
}
