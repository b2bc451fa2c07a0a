// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// Currency assumed when the scraper schema does not track one.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Canonical product listing returned to API clients.
///
/// Every field is always present; missing source data is replaced by a
/// default (empty string, `0.0`, `EUR`, empty list).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Non-negative; `0.0` when absent or unparseable
    pub price: f64,
    pub currency: String,
    pub size: String,
    pub brand: String,
    pub condition: String,
    pub category: String,
    pub color: String,
    pub material: String,
    pub image_urls: Vec<String>,
    /// Listing page on the source platform, when the scraper recorded it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// UI hint for clients; always `true` on fresh results
    pub is_selected: bool,
}

/// One row as persisted by the scraper, with every column read as text.
///
/// Column names are case-insensitive. SQL `NULL` and columns the table does
/// not have are both represented as absence.
#[derive(Debug, Clone, Default)]
pub struct RawProductRow {
    values: HashMap<String, String>,
}

impl RawProductRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a column value. `None` leaves the column absent.
    pub fn set(&mut self, column: &str, value: Option<String>) {
        match value {
            Some(v) => {
                self.values.insert(column.to_ascii_lowercase(), v);
            }
            None => {
                self.values.remove(&column.to_ascii_lowercase());
            }
        }
    }

    pub fn with(mut self, column: &str, value: &str) -> Self {
        self.set(column, Some(value.to_string()));
        self
    }

    /// Raw column value, `None` for NULL or missing columns.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .get(&column.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Trimmed column value, `None` when absent or blank.
    pub fn non_blank(&self, column: &str) -> Option<&str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Column value as an owned string, `""` when absent.
    pub fn text(&self, column: &str) -> String {
        self.get(column).unwrap_or_default().to_string()
    }
}
