// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Tracing setup and helpers for keeping log and error output bounded.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Longest stderr excerpt carried in errors and responses.
pub const STDERR_EXCERPT_CHARS: usize = 2000;

const DEFAULT_FILTER: &str = "info,vinted_agent=debug,tower_http=info";

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Trimmed tail of `text`, at most `max_chars` characters.
///
/// Diagnostic output usually ends with the actual error, so the beginning is
/// what gets dropped. A dropped prefix is marked with `...`.
pub fn tail_excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let total = trimmed.chars().count();
    if total <= max_chars {
        return trimmed.to_string();
    }
    let tail: String = trimmed.chars().skip(total - max_chars).collect();
    format!("...{}", tail)
}
