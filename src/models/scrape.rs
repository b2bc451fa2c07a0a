// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::product::Product;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Longest username accepted from the path.
pub const MAX_USERNAME_LEN: usize = 64;

/// A username that is safe to write into the scraper's input file and to pass
/// as a process argument.
///
/// Only ASCII letters, digits, `.`, `_` and `-` are allowed. The value can not
/// start with `-` (it would look like a flag) and can not be `.` or `..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            return Err("username must not be empty".to_string());
        }
        if raw.len() > MAX_USERNAME_LEN {
            return Err(format!(
                "username must be at most {} characters",
                MAX_USERNAME_LEN
            ));
        }
        if raw == "." || raw == ".." {
            return Err("username must not be a relative path component".to_string());
        }
        if raw.starts_with('-') {
            return Err("username must not start with '-'".to_string());
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(format!("username contains forbidden character {:?}", bad));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Successful scrape payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScrapeResponse {
    pub success: bool,
    pub username: String,
    pub products: Vec<Product>,
    pub count: usize,
}

impl ScrapeResponse {
    pub fn new(username: &Username, products: Vec<Product>) -> Self {
        Self {
            success: true,
            username: username.to_string(),
            count: products.len(),
            products,
        }
    }
}

/// Error envelope returned for every failed request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}
