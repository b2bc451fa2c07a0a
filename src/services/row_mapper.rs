// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Mapping of scraper table layouts onto [`Product`].
//!
//! Each known layout is a [`RowMapper`]. The extractor probes the database,
//! picks the first mapper whose table and identifying columns exist, and
//! hands every row to it as a [`RawProductRow`] of text values.

use crate::models::product::{Product, RawProductRow, DEFAULT_CURRENCY};
use serde_json::Value;
use tracing::debug;

/// One supported table layout.
pub trait RowMapper: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn table(&self) -> &'static str;

    /// Columns that may hold the requested username. Rows match when any of
    /// the ones present in the table equals it.
    fn user_columns(&self) -> &'static [&'static str];

    /// Natural row identifier; results are ordered by it.
    fn id_column(&self) -> &'static str;

    /// Every column the mapper reads. Columns missing from the table are read
    /// as NULL.
    fn columns(&self) -> &'static [&'static str];

    /// Build a product. `fallback_id` is used when the row has no identifier.
    fn map_row(&self, row: &RawProductRow, fallback_id: &str) -> Product;
}

/// Mappers in probing order.
pub fn known_mappers() -> Vec<Box<dyn RowMapper>> {
    vec![Box::new(ProductsTableMapper), Box::new(DataTableMapper)]
}

/// Generic `products` table keyed by `user_id` / `username`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductsTableMapper;

impl RowMapper for ProductsTableMapper {
    fn name(&self) -> &'static str {
        "products"
    }

    fn table(&self) -> &'static str {
        "products"
    }

    fn user_columns(&self) -> &'static [&'static str] {
        &["user_id", "username"]
    }

    fn id_column(&self) -> &'static str {
        "id"
    }

    fn columns(&self) -> &'static [&'static str] {
        &[
            "id",
            "title",
            "description",
            "price",
            "currency",
            "size",
            "brand",
            "condition",
            "category",
            "color",
            "material",
            "image_urls",
            "url",
        ]
    }

    fn map_row(&self, row: &RawProductRow, fallback_id: &str) -> Product {
        Product {
            id: row_id(row, "id", fallback_id),
            title: row.text("title"),
            description: row.text("description"),
            price: parse_price(row.get("price")),
            currency: row
                .non_blank("currency")
                .unwrap_or(DEFAULT_CURRENCY)
                .to_string(),
            size: row.text("size"),
            brand: row.text("brand"),
            condition: row.text("condition"),
            category: row.text("category"),
            color: row.text("color"),
            material: row.text("material"),
            image_urls: parse_image_urls(row.get("image_urls")),
            url: row.non_blank("url").map(str::to_string),
            is_selected: true,
        }
    }
}

/// Scraper-native `Data` table keyed by `User_id`.
///
/// This layout tracks neither currency nor material.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataTableMapper;

impl RowMapper for DataTableMapper {
    fn name(&self) -> &'static str {
        "data"
    }

    fn table(&self) -> &'static str {
        "Data"
    }

    fn user_columns(&self) -> &'static [&'static str] {
        &["User_id"]
    }

    fn id_column(&self) -> &'static str {
        "ID"
    }

    fn columns(&self) -> &'static [&'static str] {
        &[
            "ID",
            "Title",
            "Description",
            "Price",
            "size",
            "Brand",
            "State",
            "Category",
            "Colors",
            "Images",
            "Image",
            "Url",
        ]
    }

    fn map_row(&self, row: &RawProductRow, fallback_id: &str) -> Product {
        let mut image_urls = parse_image_urls(row.get("Images"));
        if image_urls.is_empty() {
            image_urls = parse_image_urls(row.get("Image"));
        }

        Product {
            id: row_id(row, "ID", fallback_id),
            title: row.text("Title"),
            description: row.text("Description"),
            price: parse_price(row.get("Price")),
            currency: DEFAULT_CURRENCY.to_string(),
            size: row.text("size"),
            brand: row.text("Brand"),
            condition: row.text("State"),
            category: row.text("Category"),
            color: row.text("Colors"),
            material: String::new(),
            image_urls,
            url: row.non_blank("Url").map(str::to_string),
            is_selected: true,
        }
    }
}

fn row_id(row: &RawProductRow, column: &str, fallback_id: &str) -> String {
    row.non_blank(column).unwrap_or(fallback_id).to_string()
}

/// Parse a loosely formatted price.
///
/// Leading currency symbols and trailing text are ignored. A comma is the
/// decimal separator when it is the only one or follows the last dot. Anything negative, non-finite or unparseable is `0.0`.
pub fn parse_price(raw: Option<&str>) -> f64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0.0;
    };
    let Some(start) = raw.find(|c: char| c.is_ascii_digit() || matches!(c, '-' | '.' | ',')) else {
        return 0.0;
    };
    let numeric: String = raw[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '-' | '.' | ','))
        .collect();
    // Whichever separator comes last is the decimal one
    let normalized = match (numeric.rfind(','), numeric.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => numeric.replace('.', "").replace(',', "."),
        (Some(_), None) => numeric.replace(',', "."),
        _ => numeric.replace(',', ""),
    };
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

/// Parse an image reference column.
///
/// Accepts a JSON array (of URL strings or objects with a `url` key), a single
/// bare URL, or a comma-separated list. Blank entries are dropped and
/// anything unparseable yields an empty list.
pub fn parse_image_urls(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };

    if raw.starts_with('[') {
        return match serde_json::from_str::<Vec<Value>>(raw) {
            Ok(values) => values
                .iter()
                .filter_map(|value| match value {
                    Value::String(url) => Some(url.as_str()),
                    Value::Object(map) => map.get("url").and_then(Value::as_str),
                    _ => None,
                })
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) => {
                debug!(error = %e, "unparseable image list");
                Vec::new()
            }
        };
    }

    raw.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}
