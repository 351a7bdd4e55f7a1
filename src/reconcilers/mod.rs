// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation handlers for PostgreSQL resources.
//!
//! This module contains the reconciliation logic for both pgop Custom
//! Resources. Each handler implements the
//! [`OperationHandler`](crate::handler::OperationHandler) contract for its
//! kind and is driven by the watch loops in the binary:
//!
//! - [`InstanceHandler`] - provisions and tears down the engine's runtime
//!   objects (Deployment plus internal/external Services)
//! - [`DatabaseHandler`] - creates, renames and drops catalogs inside a
//!   referenced instance's running engine, and self-heals missing catalogs
//!   during the drift sweep

pub mod database;
pub mod instance;

pub use database::DatabaseHandler;
pub use instance::InstanceHandler;
