// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the pgop operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all pgop CRDs
pub const API_GROUP: &str = "postgres.firestoned.io";

/// API version for all pgop CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "postgres.firestoned.io/v1alpha1";

/// Kind name for the `PostgresInstance` resource
pub const KIND_POSTGRES_INSTANCE: &str = "PostgresInstance";

/// Kind name for the `PostgresDatabase` resource
pub const KIND_POSTGRES_DATABASE: &str = "PostgresDatabase";

/// Namespace watched when no CLI argument is given
pub const DEFAULT_NAMESPACE: &str = "default";

// ============================================================================
// Provisioned Object Names
// ============================================================================

/// Suffix of the workload Deployment provisioned for an instance
pub const DEPLOYMENT_SUFFIX: &str = "-deployment";

/// Suffix of the cluster-internal Service provisioned for an instance
pub const INTERNAL_SERVICE_SUFFIX: &str = "-internal-svc";

/// Suffix of the externally exposed Service provisioned for an instance
pub const EXTERNAL_SERVICE_SUFFIX: &str = "-external-svc";

// ============================================================================
// Engine Constants
// ============================================================================

/// PostgreSQL wire protocol port, exposed by the container and both services
pub const POSTGRES_PORT: u16 = 5432;

/// Engine major versions with a pinned container image
pub const SUPPORTED_ENGINE_VERSIONS: [i32; 3] = [12, 13, 14];

/// Engine version used when the spec selects an unsupported version
pub const DEFAULT_ENGINE_VERSION: i32 = 14;

/// Container name of the engine within the Deployment
pub const CONTAINER_NAME_POSTGRES: &str = "postgres";

/// Environment variable naming the catalog created at engine startup
pub const ENV_POSTGRES_DB: &str = "POSTGRES_DB";

/// Environment variable carrying the engine superuser name
pub const ENV_POSTGRES_USER: &str = "POSTGRES_USER";

/// Environment variable carrying the engine superuser password
pub const ENV_POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";

// ============================================================================
// Secret Constants
// ============================================================================

/// Required key for the user id in a referenced credentials Secret
pub const SECRET_KEY_USER_ID: &str = "userid";

/// Required key for the password in a referenced credentials Secret
pub const SECRET_KEY_PASSWORD: &str = "password";

// ============================================================================
// Service Exposure Constants
// ============================================================================

/// Cluster-internal service exposure
pub const SERVICE_TYPE_CLUSTER_IP: &str = "ClusterIP";

/// Externally load-balanced service exposure
pub const SERVICE_TYPE_LOAD_BALANCER: &str = "LoadBalancer";

// ============================================================================
// Reconciliation Constants
// ============================================================================

/// Seconds between drift-detection sweep passes
pub const DRIFT_SWEEP_INTERVAL_SECS: u64 = 5;

/// Upper bound on a single SQL connect or statement, in seconds.
/// A statement exceeding this surfaces as a retryable timeout instead of
/// blocking the kind lock indefinitely.
pub const SQL_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Label Constants
// ============================================================================

/// `app.kubernetes.io/name` value on all provisioned objects
pub const APP_NAME_POSTGRES: &str = "postgres";

/// `app.kubernetes.io/managed-by` value on all provisioned objects
pub const MANAGED_BY_POSTGRES_INSTANCE: &str = "PostgresInstance";

/// `app.kubernetes.io/part-of` value on all provisioned objects
pub const PART_OF_PGOP: &str = "pgop";
