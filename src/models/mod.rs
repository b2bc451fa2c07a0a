// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod product;
pub mod scrape;
pub mod settings;
pub mod version;
