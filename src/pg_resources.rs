// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! PostgreSQL Kubernetes resource builders
//!
//! This module provides functions to build the Kubernetes resources
//! (`Deployment`, `Service`) provisioned for a `PostgresInstance`. All
//! functions are pure and easily testable.

use crate::constants::{
    APP_NAME_POSTGRES, CONTAINER_NAME_POSTGRES, DEFAULT_ENGINE_VERSION, DEPLOYMENT_SUFFIX,
    ENV_POSTGRES_DB, ENV_POSTGRES_PASSWORD, ENV_POSTGRES_USER, EXTERNAL_SERVICE_SUFFIX,
    INTERNAL_SERVICE_SUFFIX, MANAGED_BY_POSTGRES_INSTANCE, PART_OF_PGOP, POSTGRES_PORT,
    SECRET_KEY_PASSWORD, SECRET_KEY_USER_ID, SUPPORTED_ENGINE_VERSIONS,
};
use crate::crd::PostgresInstance;
use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentSpec},
    core::v1::{
        Container, ContainerPort, EnvVar, EnvVarSource, PodSpec, PodTemplateSpec,
        SecretKeySelector, Service, ServicePort, ServiceSpec,
    },
};
use k8s_openapi::apimachinery::pkg::{
    apis::meta::v1::{LabelSelector, ObjectMeta},
    util::intstr::IntOrString,
};
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::debug;

/// Name of the workload Deployment provisioned for `instance_name`.
#[must_use]
pub fn deployment_name(instance_name: &str) -> String {
    format!("{instance_name}{DEPLOYMENT_SUFFIX}")
}

/// Name of the cluster-internal Service provisioned for `instance_name`.
#[must_use]
pub fn internal_service_name(instance_name: &str) -> String {
    format!("{instance_name}{INTERNAL_SERVICE_SUFFIX}")
}

/// Name of the externally exposed Service provisioned for `instance_name`.
#[must_use]
pub fn external_service_name(instance_name: &str) -> String {
    format!("{instance_name}{EXTERNAL_SERVICE_SUFFIX}")
}

/// Builds standardized Kubernetes labels for objects provisioned for an
/// instance.
///
/// The plain `app` label doubles as the Deployment's pod selector, so it must
/// stay stable for the lifetime of the instance.
///
/// # Arguments
///
/// * `instance_name` - Name of the `PostgresInstance` resource
///
/// # Returns
///
/// A `BTreeMap` of label key-value pairs
#[must_use]
pub fn build_labels(instance_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".into(), instance_name.into());
    labels.insert("app.kubernetes.io/name".into(), APP_NAME_POSTGRES.into());
    labels.insert("app.kubernetes.io/instance".into(), instance_name.into());
    labels.insert(
        "app.kubernetes.io/managed-by".into(),
        MANAGED_BY_POSTGRES_INSTANCE.into(),
    );
    labels.insert("app.kubernetes.io/part-of".into(), PART_OF_PGOP.into());
    labels
}

/// Resolve the engine container image for a spec'd major version.
///
/// Unsupported versions fall back to the default engine version instead of
/// failing provisioning.
#[must_use]
pub fn engine_image(version: i32) -> String {
    if SUPPORTED_ENGINE_VERSIONS.contains(&version) {
        format!("postgres:{version}")
    } else {
        debug!(
            version,
            fallback = DEFAULT_ENGINE_VERSION,
            "Unsupported engine version, falling back to default"
        );
        format!("postgres:{DEFAULT_ENGINE_VERSION}")
    }
}

/// Builds the workload Deployment for a `PostgresInstance`.
///
/// Creates a single-replica Deployment running the selected engine version
/// with:
/// - `POSTGRES_DB` sourced literally from the spec's initial catalog
/// - `POSTGRES_USER` / `POSTGRES_PASSWORD` sourced indirectly from the
///   referenced credentials Secret
/// - port 5432 exposed
///
/// # Arguments
///
/// * `instance` - The `PostgresInstance` to provision
///
/// # Returns
///
/// A Kubernetes Deployment resource ready for creation
#[must_use]
pub fn build_deployment(instance: &PostgresInstance) -> Deployment {
    let name = instance.name_any();
    let namespace = instance.namespace().unwrap_or_default();
    let labels = build_labels(&name);

    debug!(
        name = %deployment_name(&name),
        namespace = %namespace,
        version = instance.spec.engine.version,
        "Building Deployment for PostgresInstance"
    );

    let container = Container {
        name: CONTAINER_NAME_POSTGRES.into(),
        image: Some(engine_image(instance.spec.engine.version)),
        image_pull_policy: Some("Always".into()),
        ports: Some(vec![ContainerPort {
            container_port: i32::from(POSTGRES_PORT),
            protocol: Some("TCP".into()),
            ..Default::default()
        }]),
        env: Some(vec![
            EnvVar {
                name: ENV_POSTGRES_DB.into(),
                value: Some(instance.spec.initial_catalog.clone()),
                ..Default::default()
            },
            EnvVar {
                name: ENV_POSTGRES_USER.into(),
                value_from: Some(EnvVarSource {
                    secret_key_ref: Some(SecretKeySelector {
                        name: instance.spec.credentials.clone(),
                        key: SECRET_KEY_USER_ID.into(),
                        optional: Some(false),
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
            EnvVar {
                name: ENV_POSTGRES_PASSWORD.into(),
                value_from: Some(EnvVarSource {
                    secret_key_ref: Some(SecretKeySelector {
                        name: instance.spec.credentials.clone(),
                        key: SECRET_KEY_PASSWORD.into(),
                        optional: Some(false),
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ]),
        ..Default::default()
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(deployment_name(&name)),
            namespace: Some(namespace),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Builds one of the two Services provisioned for a `PostgresInstance`.
///
/// The same builder serves both exposures: the internal Service is always
/// `ClusterIP`, the external Service takes its type from the spec.
///
/// # Arguments
///
/// * `instance` - The `PostgresInstance` to provision
/// * `service_type` - Kubernetes Service type (`ClusterIP`, `LoadBalancer`, ...)
/// * `service_name` - Full name of the Service (`<instance>-internal-svc` or
///   `<instance>-external-svc`)
///
/// # Returns
///
/// A Kubernetes Service resource ready for creation
#[must_use]
pub fn build_service(instance: &PostgresInstance, service_type: &str, service_name: &str) -> Service {
    let name = instance.name_any();
    let namespace = instance.namespace().unwrap_or_default();
    let labels = build_labels(&name);

    debug!(
        name = %service_name,
        namespace = %namespace,
        r#type = %service_type,
        "Building Service for PostgresInstance"
    );

    Service {
        metadata: ObjectMeta {
            name: Some(service_name.into()),
            namespace: Some(namespace),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(service_type.into()),
            selector: Some(labels),
            ports: Some(vec![ServicePort {
                protocol: Some("TCP".into()),
                port: i32::from(POSTGRES_PORT),
                target_port: Some(IntOrString::Int(i32::from(POSTGRES_PORT))),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
