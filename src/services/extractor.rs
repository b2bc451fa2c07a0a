// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Reads scraped listings back out of the scraper's SQLite artifact.
//!
//! A zero exit code from the scraper does not guarantee a usable file, so
//! every database-level problem (missing file, corrupt file, unknown layout)
//! degrades to an empty result with a warning instead of failing the request.

use crate::models::product::{Product, RawProductRow};
use crate::models::scrape::Username;
use crate::services::row_mapper::{known_mappers, RowMapper};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Connection, Row};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("database file {0} does not exist")]
    Missing(PathBuf),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A SELECT built for one mapper against the columns a table actually has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedQuery {
    pub sql: String,
    /// How many times the username has to be bound.
    pub user_params: usize,
}

/// Schema-aware product reader.
pub struct ResultExtractor {
    mappers: Vec<Box<dyn RowMapper>>,
}

impl Default for ResultExtractor {
    fn default() -> Self {
        Self::new(known_mappers())
    }
}

impl ResultExtractor {
    pub fn new(mappers: Vec<Box<dyn RowMapper>>) -> Self {
        Self { mappers }
    }

    /// All products scraped for `username`, ordered by row identifier.
    ///
    /// Never fails; unreadable databases yield an empty list.
    pub async fn extract(&self, database_path: &Path, username: &Username) -> Vec<Product> {
        match self.try_extract(database_path, username).await {
            Ok(products) => products,
            Err(e) => {
                warn!(
                    database = %database_path.display(),
                    error = %e,
                    "could not read scraper database, returning no products"
                );
                Vec::new()
            }
        }
    }

    async fn try_extract(
        &self,
        database_path: &Path,
        username: &Username,
    ) -> Result<Vec<Product>, ExtractionError> {
        if !database_path.is_file() {
            return Err(ExtractionError::Missing(database_path.to_path_buf()));
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .read_only(true)
            .create_if_missing(false);
        let mut conn = SqliteConnection::connect_with(&options).await?;

        let result = self.read_products(&mut conn, username).await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "failed to close scraper database");
        }
        result
    }

    async fn read_products(
        &self,
        conn: &mut SqliteConnection,
        username: &Username,
    ) -> Result<Vec<Product>, ExtractionError> {
        let tables = table_names(conn).await?;

        for mapper in &self.mappers {
            if !tables.contains(&mapper.table().to_ascii_lowercase()) {
                continue;
            }
            let columns = table_columns(conn, mapper.table()).await?;
            let Some(query) = build_query(mapper.as_ref(), &columns) else {
                debug!(
                    mapper = mapper.name(),
                    "table has no user column, skipping layout"
                );
                continue;
            };

            let mut statement = sqlx::query(&query.sql);
            for _ in 0..query.user_params {
                statement = statement.bind(username.as_str());
            }
            let rows = statement.fetch_all(&mut *conn).await?;

            let products: Vec<Product> = rows
                .iter()
                .enumerate()
                .map(|(index, row)| {
                    let raw = raw_row(mapper.as_ref(), row);
                    mapper.map_row(&raw, &format!("{}_{}", username, index))
                })
                .collect();

            info!(
                mapper = mapper.name(),
                username = %username,
                rows = products.len(),
                "extracted products"
            );
            return Ok(products);
        }

        warn!(
            tables = ?tables,
            "scraper database matches no known layout"
        );
        Ok(Vec::new())
    }
}

/// Build the SELECT for `mapper` given the lowercase column names of its table.
///
/// Returns `None` when none of the mapper's user columns exist. Every column
/// is read as text; missing ones are projected as NULL.
pub fn build_query(mapper: &dyn RowMapper, existing: &HashSet<String>) -> Option<MappedQuery> {
    let has = |column: &str| existing.contains(&column.to_ascii_lowercase());

    let user_columns: Vec<&str> = mapper
        .user_columns()
        .iter()
        .copied()
        .filter(|c| has(c))
        .collect();
    if user_columns.is_empty() {
        return None;
    }

    let projection = mapper
        .columns()
        .iter()
        .map(|c| {
            if has(c) {
                format!("CAST(\"{c}\" AS TEXT) AS \"{c}\"")
            } else {
                format!("NULL AS \"{c}\"")
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    let filter = user_columns
        .iter()
        .map(|c| format!("CAST(\"{c}\" AS TEXT) = ?"))
        .collect::<Vec<_>>()
        .join(" OR ");

    let order = if has(mapper.id_column()) {
        format!("\"{}\" ASC, rowid ASC", mapper.id_column())
    } else {
        "rowid ASC".to_string()
    };

    Some(MappedQuery {
        sql: format!(
            "SELECT {projection} FROM \"{}\" WHERE {filter} ORDER BY {order}",
            mapper.table()
        ),
        user_params: user_columns.len(),
    })
}

/// Copy the mapper's columns out of a result row. Values that fail to decode
/// are treated as NULL so one bad cell does not cost the whole row.
fn raw_row(mapper: &dyn RowMapper, row: &SqliteRow) -> RawProductRow {
    let mut raw = RawProductRow::new();
    for column in mapper.columns() {
        let value = match row.try_get::<Option<String>, _>(*column) {
            Ok(value) => value,
            Err(e) => {
                debug!(column, error = %e, "undecodable column value");
                None
            }
        };
        raw.set(column, value);
    }
    raw
}

async fn table_names(conn: &mut SqliteConnection) -> Result<HashSet<String>, sqlx::Error> {
    let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
        .fetch_all(&mut *conn)
        .await?;
    rows.iter()
        .map(|row| {
            row.try_get::<String, _>("name")
                .map(|name| name.to_ascii_lowercase())
        })
        .collect()
}

async fn table_columns(
    conn: &mut SqliteConnection,
    table: &str,
) -> Result<HashSet<String>, sqlx::Error> {
    let rows = sqlx::query(&format!("PRAGMA table_info(\"{table}\")"))
        .fetch_all(&mut *conn)
        .await?;
    rows.iter()
        .map(|row| {
            row.try_get::<String, _>("name")
                .map(|name| name.to_ascii_lowercase())
        })
        .collect()
}
