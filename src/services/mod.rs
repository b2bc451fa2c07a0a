// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod extractor;
pub mod logging;
pub mod row_mapper;
pub mod scrape;
pub mod scraper;
pub mod workspace;
