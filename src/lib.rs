// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # pgop - PostgreSQL Operator for Kubernetes
//!
//! pgop is a Kubernetes operator written in Rust that manages PostgreSQL
//! engine deployments and the SQL catalogs inside them through Custom
//! Resource Definitions (CRDs).
//!
//! ## Overview
//!
//! This library provides the core functionality for the pgop operator,
//! including:
//!
//! - Custom Resource Definitions (CRDs) for engine instances and catalogs
//! - Reconciliation logic driven by cluster watch events
//! - Kubernetes resource builders for the provisioned Deployment and Services
//! - A periodic drift sweep that recreates catalogs deleted out-of-band
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types for PostgreSQL resources
//! - [`handler`] - The per-kind operation handler contract and [`handler::Outcome`]
//! - [`reconcilers`] - Reconciliation logic for each resource type
//! - [`state`] - Injectable per-kind tracking stores
//! - [`resolver`] - Read-through resolution of a catalog's owning instance
//! - [`sql`] - Statement builders and the SQL execution seam
//! - [`pg_resources`] - Kubernetes resource builders for provisioned objects
//!
//! ## Example
//!
//! ```rust
//! use pgop::crd::{EngineSpec, PostgresInstanceSpec, PrimaryServiceSpec, ServicesSpec};
//!
//! let spec = PostgresInstanceSpec {
//!     engine: EngineSpec { version: 14 },
//!     services: ServicesSpec {
//!         primary: PrimaryServiceSpec {
//!             service_type: "LoadBalancer".to_string(),
//!         },
//!     },
//!     credentials: "pg1-secret".to_string(),
//!     initial_catalog: "appdb".to_string(),
//! };
//! ```

pub mod constants;
pub mod crd;
pub mod handler;
pub mod pg_resources;
pub mod reconcilers;
pub mod resolver;
pub mod sql;
pub mod state;

#[cfg(test)]
mod crd_tests;
#[cfg(test)]
mod resolver_tests;
#[cfg(test)]
mod sql_tests;
#[cfg(test)]
mod state_tests;
