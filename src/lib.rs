// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Confidential Risk Analysis Service
//!
//! Stores encrypted corporate financial reports, correlates asynchronous
//! decryption-oracle callbacks with the reports and industry aggregates that
//! requested them, and classifies revealed reports by risk.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `fhe` - encryption engine and decryption oracle capabilities
//! - `protocol` - correlation, aggregation and the analysis workflow
//! - `storage` - keyed record store (redb) and typed repositories
//! - `expiry`, `relay` - background tasks

pub mod api;
pub mod config;
pub mod error;
pub mod expiry;
pub mod fhe;
pub mod models;
pub mod protocol;
pub mod relay;
pub mod state;
pub mod storage;
