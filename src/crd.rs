// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for PostgreSQL management.
//!
//! This module defines the two Kubernetes Custom Resource Definitions used by
//! pgop to manage PostgreSQL infrastructure declaratively.
//!
//! # Resource Types
//!
//! - [`PostgresInstance`] - a running PostgreSQL engine deployment and its
//!   network exposure
//! - [`PostgresDatabase`] - a catalog that must exist inside a referenced
//!   instance
//!
//! # Example: Declaring an Instance
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
//!
//! # Example: Declaring a Database
//!
//! ```rust
//! use pgop::crd::PostgresDatabaseSpec;
//!
//! let spec = PostgresDatabaseSpec {
//!     instance: "pg1".to_string(),
//!     db_name: "orders".to_string(),
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Engine selection for a [`PostgresInstance`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct EngineSpec {
    /// PostgreSQL major version to run. Supported: 12, 13, 14.
    /// Unsupported versions fall back to the default engine image rather
    /// than failing provisioning.
    pub version: i32,
}

/// Network exposure of the instance's primary endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct PrimaryServiceSpec {
    /// Kubernetes Service type for the external endpoint
    /// (`ClusterIP` or `LoadBalancer`).
    #[serde(rename = "type")]
    pub service_type: String,
}

/// Service exposure block of a [`PostgresInstance`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ServicesSpec {
    /// Exposure of the primary endpoint.
    pub primary: PrimaryServiceSpec,
}

/// `PostgresInstance` declares one running PostgreSQL engine deployment.
///
/// Provisioning creates three objects, named after the instance:
/// `<name>-deployment`, `<name>-internal-svc` (always `ClusterIP`) and
/// `<name>-external-svc` (the spec'd exposure type). The spec is treated as
/// immutable after creation; updates to an existing instance are not
/// reconciled into the live deployment.
///
/// # Example
///
/// ```yaml
/// apiVersion: postgres.firestoned.io/v1alpha1
/// kind: PostgresInstance
/// metadata:
///   name: pg1
/// spec:
///   engine:
///     version: 14
///   services:
///     primary:
///       type: LoadBalancer
///   credentials: pg1-secret
///   initialCatalog: appdb
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "postgres.firestoned.io",
    version = "v1alpha1",
    kind = "PostgresInstance",
    plural = "postgresinstances",
    singular = "postgresinstance",
    shortname = "pgi",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct PostgresInstanceSpec {
    /// Engine version selection.
    pub engine: EngineSpec,

    /// Network exposure of the primary endpoint.
    pub services: ServicesSpec,

    /// Name of a Secret in the instance's namespace carrying the engine
    /// credentials. The Secret must contain the keys `userid` and `password`.
    pub credentials: String,

    /// Name of the catalog created by the engine at first startup. This is
    /// also the administrative catalog pgop connects to when provisioning
    /// further catalogs.
    pub initial_catalog: String,
}

/// `PostgresDatabase` declares one catalog inside a referenced
/// [`PostgresInstance`].
///
/// The owning instance is referenced by name and re-resolved on every
/// operation that needs connection information; nothing about the endpoint
/// or credentials is stored on the database resource itself.
///
/// # Example
///
/// ```yaml
/// apiVersion: postgres.firestoned.io/v1alpha1
/// kind: PostgresDatabase
/// metadata:
///   name: db1
/// spec:
///   instance: pg1
///   dbName: orders
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "postgres.firestoned.io",
    version = "v1alpha1",
    kind = "PostgresDatabase",
    plural = "postgresdatabases",
    singular = "postgresdatabase",
    shortname = "pgdb",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct PostgresDatabaseSpec {
    /// Name of the owning `PostgresInstance` in the same namespace.
    pub instance: String,

    /// Desired catalog name inside the owning instance's engine.
    pub db_name: String,
}
