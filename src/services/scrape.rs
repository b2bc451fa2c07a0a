// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! One scrape request end to end: workspace, scraper run, extraction, cleanup.

use crate::models::product::Product;
use crate::models::scrape::Username;
use crate::models::settings::ScraperConfig;
use crate::services::extractor::ResultExtractor;
use crate::services::logging::{tail_excerpt, STDERR_EXCERPT_CHARS};
use crate::services::scraper::{ImageMode, InvocationError, ScraperInvoker};
use crate::services::workspace::{Workspace, WorkspaceError};
use thiserror::Error;
use tracing::{debug, info, Instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),
    #[error("Image scraping is not implemented yet")]
    ImagesNotImplemented,
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

/// Runs scrapes. Holds no per-request state, so one instance serves all
/// concurrent requests.
pub struct ScrapeService {
    invoker: ScraperInvoker,
    extractor: ResultExtractor,
}

impl ScrapeService {
    pub fn new(config: ScraperConfig) -> Self {
        Self::with_parts(ScraperInvoker::new(config), ResultExtractor::default())
    }

    pub fn with_parts(invoker: ScraperInvoker, extractor: ResultExtractor) -> Self {
        Self { invoker, extractor }
    }

    pub fn config(&self) -> &ScraperConfig {
        self.invoker.config()
    }

    /// Scrape `username` and return its products.
    ///
    /// The workspace is released before this returns, whatever the outcome.
    pub async fn scrape(
        &self,
        username: &Username,
        images: ImageMode,
    ) -> Result<Vec<Product>, ScrapeError> {
        if images == ImageMode::IncludeImages {
            return Err(ScrapeError::ImagesNotImplemented);
        }

        let span = tracing::info_span!(
            "scrape",
            request_id = %Uuid::now_v7(),
            username = %username
        );
        async {
            let workspace = Workspace::acquire()?;
            let result = self.scrape_in(&workspace, username, images).await;
            workspace.close().await;

            if let Ok(products) = &result {
                info!(count = products.len(), "scrape finished");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn scrape_in(
        &self,
        workspace: &Workspace,
        username: &Username,
        images: ImageMode,
    ) -> Result<Vec<Product>, ScrapeError> {
        workspace
            .write_user_list(&self.config().users_file, username)
            .await?;

        let invocation = self.invoker.run(workspace, images).await?;
        debug!(
            elapsed_ms = invocation.elapsed.as_millis() as u64,
            stdout_bytes = invocation.stdout.len(),
            stderr = %tail_excerpt(&invocation.stderr, STDERR_EXCERPT_CHARS),
            "scraper output"
        );

        Ok(self
            .extractor
            .extract(&invocation.database_path, username)
            .await)
    }
}
