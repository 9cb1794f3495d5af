use anyhow::{Context, Result};
use rusqlite::{params_from_iter, types::Value, Connection};

use crate::domain::entities::keplero::{Histogram, ProtocolloGrouped, ValueCount};
use crate::domain::entities::pivot::PageResult;
use crate::infra::sqlite::rows::TableRow;
use crate::infra::sqlite::schema::quote_ident;
use crate::query::QueryPlan;

const NULL_PLACEHOLDER: &str = "N/A";

/// Runs a translated plan against one table: filtered count, then the window.
pub fn query_page<R: TableRow>(
    conn: &Connection,
    table: &str,
    plan: &QueryPlan,
) -> Result<PageResult<R>> {
    let table = quote_ident(table);
    let where_sql = plan.filter.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM {table} WHERE {where_sql}");
    let row_count: i64 = conn
        .query_row(
            &count_sql,
            params_from_iter(plan.filter.params().iter()),
            |row| row.get(0),
        )
        .context("failed to query filtered row count")?;

    if plan.window.len_within(row_count) == 0 {
        return Ok(PageResult {
            row_data: Vec::new(),
            row_count,
        });
    }

    let row_sql = format!(
        "SELECT {columns} FROM {table} WHERE {where_sql} ORDER BY {order} LIMIT ? OFFSET ?",
        columns = R::select_list(),
        order = plan.order.order_sql(),
    );
    let row_data = fetch_rows::<R>(conn, &row_sql, plan)?;

    Ok(PageResult {
        row_data,
        row_count,
    })
}

/// Groups the filtered rows by `NumeroProtocollo`.
///
/// Representative attributes come from the lowest `Id` in each group.
pub fn query_grouped_page(
    conn: &Connection,
    table: &str,
    plan: &QueryPlan,
) -> Result<PageResult<ProtocolloGrouped>> {
    let table = quote_ident(table);
    let where_sql = plan.filter.where_sql();

    let grouped_sql = format!(
        "SELECT NumeroProtocollo, COUNT(*) AS RowCount, MIN(Id) AS FirstId
         FROM {table}
         WHERE {where_sql}
         GROUP BY NumeroProtocollo"
    );

    let count_sql = format!("SELECT COUNT(*) FROM ({grouped_sql})");
    let row_count: i64 = conn
        .query_row(
            &count_sql,
            params_from_iter(plan.filter.params().iter()),
            |row| row.get(0),
        )
        .context("failed to query grouped row count")?;

    if plan.window.len_within(row_count) == 0 {
        return Ok(PageResult {
            row_data: Vec::new(),
            row_count,
        });
    }

    let row_sql = format!(
        "SELECT {columns}
         FROM ({grouped_sql}) g
         JOIN {table} r ON r.Id = g.FirstId
         ORDER BY {order}
         LIMIT ? OFFSET ?",
        columns = ProtocolloGrouped::select_list(),
        order = plan.order.order_sql(),
    );
    let row_data = fetch_rows::<ProtocolloGrouped>(conn, &row_sql, plan)?;

    Ok(PageResult {
        row_data,
        row_count,
    })
}

fn fetch_rows<R: TableRow>(conn: &Connection, sql: &str, plan: &QueryPlan) -> Result<Vec<R>> {
    let mut params: Vec<Value> = plan.filter.params().to_vec();
    params.push(Value::Integer(plan.window.limit));
    params.push(Value::Integer(plan.window.offset));

    let mut stmt = conn.prepare(sql).context("failed to prepare page query")?;
    let rows = stmt
        .query_map(params_from_iter(params), R::from_row)
        .context("failed to query page rows")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect page rows")?;
    Ok(rows)
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |row| row.get(0),
    )
    .with_context(|| format!("failed to count rows of {table}"))
}

/// Row count per distinct value, most frequent first.
///
/// NULL keeps its own bucket, labelled `N/A` only after grouping, so a
/// stored `N/A` string is never merged with it. Among equal counts the
/// NULL bucket comes last.
pub fn value_histogram(
    conn: &Connection,
    table: &str,
    column: &str,
    label: &'static str,
) -> Result<Histogram> {
    let sql = format!(
        "SELECT CAST({column} AS TEXT) AS Value, COUNT(*) AS RowCount
         FROM {table}
         GROUP BY Value
         ORDER BY RowCount DESC, Value IS NULL, Value ASC",
        table = quote_ident(table),
    );
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("failed to prepare histogram for {column}"))?;
    let buckets = stmt
        .query_map([], |row| {
            Ok(ValueCount {
                value: row
                    .get::<_, Option<String>>(0)?
                    .unwrap_or_else(|| NULL_PLACEHOLDER.to_string()),
                count: row.get(1)?,
            })
        })
        .with_context(|| format!("failed to query histogram for {column}"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("failed to collect histogram for {column}"))?;

    Ok(Histogram { label, buckets })
}

/// Distinct non-blank values of one column, ascending.
pub fn distinct_values(conn: &Connection, table: &str, column: &str) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT DISTINCT CAST({column} AS TEXT) AS Value
         FROM {table}
         WHERE {column} IS NOT NULL AND trim(CAST({column} AS TEXT)) <> ''
         ORDER BY Value ASC",
        table = quote_ident(table),
    );
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("failed to prepare distinct values for {column}"))?;
    let values = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .with_context(|| format!("failed to query distinct values for {column}"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("failed to collect distinct values for {column}"))?;
    Ok(values)
}

/// Protocols whose comparison status disagrees with the Keplero status.
pub fn mismatched_protocols(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT Protocollo
         FROM {table}
         WHERE lower(trim(COALESCE(StatoPratica, ''))) <> lower(trim(COALESCE(StatoPratica_Keplero, '')))
         ORDER BY Protocollo ASC",
        table = quote_ident(table),
    );
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare mismatch query")?;
    let protocols = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("failed to query mismatches")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect mismatches")?;
    Ok(protocols)
}

/// Inserts rows given as `(column, value)` lists in one transaction.
pub fn insert_rows(
    conn: &mut Connection,
    table: &str,
    columns: &[String],
    rows: &[Vec<Value>],
    replace: bool,
) -> Result<i64> {
    if columns.is_empty() {
        anyhow::bail!("no importable columns for {table}");
    }

    let quoted_table = quote_ident(table);
    let tx = conn
        .transaction()
        .context("failed to start import transaction")?;

    if replace {
        tx.execute(&format!("DELETE FROM {quoted_table}"), [])
            .with_context(|| format!("failed to clear {table}"))?;
    }

    let column_list = columns
        .iter()
        .map(|column| quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    let mut insert = tx
        .prepare(&format!(
            "INSERT INTO {quoted_table}({column_list}) VALUES ({placeholders})"
        ))
        .context("failed to prepare row insert")?;

    let mut inserted = 0_i64;
    for row in rows {
        insert
            .execute(params_from_iter(row.iter()))
            .with_context(|| format!("failed to insert row {} into {table}", inserted + 1))?;
        inserted += 1;
    }
    drop(insert);

    tx.commit().context("failed to commit import transaction")?;
    Ok(inserted)
}
