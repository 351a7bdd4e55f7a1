// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Read-through resolution of a database's owning instance.
//!
//! A `PostgresDatabase` references its owning `PostgresInstance` by name
//! only, so every operation that needs connection information re-resolves
//! the reference: instance spec (credentials secret name, administrative
//! catalog) from the shared tracked-instance store with a cluster-API
//! fallback, credentials from the Secret, and the live endpoint from the
//! instance's external Service. Nothing is cached across calls; the source
//! data can change between events.
//!
//! Every failure here is a configuration error that is fatal to the single
//! operation and never retried automatically.

use crate::constants::{SECRET_KEY_PASSWORD, SECRET_KEY_USER_ID};
use crate::crd::{PostgresDatabase, PostgresInstance};
use crate::pg_resources::{external_service_name, internal_service_name};
use crate::sql::ConnectionInfo;
use crate::state::{object_id, Store};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::{Api, Client, ResourceExt};
use thiserror::Error;
use tracing::debug;

/// Configuration errors raised while resolving a database's connection
/// descriptor.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The referenced `PostgresInstance` exists neither in the tracked set
    /// nor in the cluster.
    #[error("PostgresInstance '{name}' not found in namespace {namespace}")]
    InstanceNotFound {
        /// Referenced instance name.
        name: String,
        /// Namespace searched.
        namespace: String,
    },

    /// The instance's credentials Secret is missing.
    #[error("Secret '{name}' not found in namespace {namespace}")]
    SecretNotFound {
        /// Referenced secret name.
        name: String,
        /// Namespace searched.
        namespace: String,
    },

    /// The credentials Secret lacks a required key.
    #[error("Secret '{secret}' does not contain the '{key}' data property")]
    MissingSecretKey {
        /// Secret that was inspected.
        secret: String,
        /// Key that was required.
        key: String,
    },

    /// A secret payload is not valid UTF-8.
    #[error("Secret '{secret}' key '{key}' is not valid UTF-8 text")]
    InvalidSecretText {
        /// Secret that was inspected.
        secret: String,
        /// Offending key.
        key: String,
    },

    /// The instance's external Service is missing.
    #[error("Service '{name}' not found in namespace {namespace}")]
    ServiceNotFound {
        /// Expected service name.
        name: String,
        /// Namespace searched.
        namespace: String,
    },

    /// The external Service has no load-balancer ingress address yet.
    #[error("Service '{name}' has no load balancer ingress address")]
    NoIngressAddress {
        /// Service that was inspected.
        name: String,
    },

    /// Cluster API failure during a lookup.
    #[error(transparent)]
    Kube(#[from] kube::Error),
}

/// Decode a required Secret key as UTF-8 text.
///
/// # Errors
///
/// Returns [`ResolveError::MissingSecretKey`] if the key is absent and
/// [`ResolveError::InvalidSecretText`] if its payload is not text.
pub fn decode_secret_key(secret: &Secret, key: &str) -> Result<String, ResolveError> {
    let secret_name = secret.name_any();
    let data = secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .ok_or_else(|| ResolveError::MissingSecretKey {
            secret: secret_name.clone(),
            key: key.to_string(),
        })?;
    String::from_utf8(data.0.clone()).map_err(|_| ResolveError::InvalidSecretText {
        secret: secret_name,
        key: key.to_string(),
    })
}

/// First ingress address of a Service's load-balancer status, preferring the
/// IP over the hostname.
#[must_use]
pub fn ingress_address(service: &Service) -> Option<String> {
    service
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|ingress| ingress.first())
        .and_then(|first| first.ip.clone().or_else(|| first.hostname.clone()))
}

/// Resolves the connection descriptor for a `PostgresDatabase`.
///
/// Injected into the database reconciler so tests can substitute a static
/// resolver for the cluster-backed one.
#[async_trait]
pub trait InstanceResolver: Send + Sync {
    /// Resolve the administrative connection descriptor for `db`'s owning
    /// instance.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] naming the missing piece of configuration.
    async fn resolve(&self, db: &PostgresDatabase) -> Result<ConnectionInfo, ResolveError>;
}

/// Cluster-backed [`InstanceResolver`].
///
/// Reads the instance spec from the shared tracked-instance store first
/// (the authoritative cache), falling back to a cluster-API get for
/// instances that predate this process. Secrets and Services are always
/// fetched live.
pub struct KubeInstanceResolver {
    client: Client,
    instances: Store<PostgresInstance>,
    in_cluster: bool,
}

impl KubeInstanceResolver {
    /// Create a resolver sharing the instance handler's tracked store.
    ///
    /// `in_cluster` selects the endpoint convention: inside the cluster the
    /// internal Service DNS name is used, outside the external Service's
    /// first load-balancer ingress address.
    #[must_use]
    pub fn new(client: Client, instances: Store<PostgresInstance>, in_cluster: bool) -> Self {
        Self {
            client,
            instances,
            in_cluster,
        }
    }

    async fn lookup_instance(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PostgresInstance, ResolveError> {
        if let Some(instance) = self.instances.get(&object_id(namespace, name)).await {
            return Ok(instance);
        }
        debug!(
            instance = %name,
            namespace = %namespace,
            "Instance not in tracked set, falling back to API lookup"
        );
        let api: Api<PostgresInstance> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await?
            .ok_or_else(|| ResolveError::InstanceNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            })
    }
}

#[async_trait]
impl InstanceResolver for KubeInstanceResolver {
    async fn resolve(&self, db: &PostgresDatabase) -> Result<ConnectionInfo, ResolveError> {
        let namespace = db.namespace().unwrap_or_default();
        let instance_name = &db.spec.instance;

        let instance = self.lookup_instance(&namespace, instance_name).await?;

        let secret_name = &instance.spec.credentials;
        let secret_api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);
        let secret =
            secret_api
                .get_opt(secret_name)
                .await?
                .ok_or_else(|| ResolveError::SecretNotFound {
                    name: secret_name.clone(),
                    namespace: namespace.clone(),
                })?;
        let user = decode_secret_key(&secret, SECRET_KEY_USER_ID)?;
        let password = decode_secret_key(&secret, SECRET_KEY_PASSWORD)?;

        // The external service is the endpoint's liveness signal; it must
        // exist even when the connection goes through the internal name.
        let svc_name = external_service_name(instance_name);
        let svc_api: Api<Service> = Api::namespaced(self.client.clone(), &namespace);
        let service =
            svc_api
                .get_opt(&svc_name)
                .await?
                .ok_or_else(|| ResolveError::ServiceNotFound {
                    name: svc_name.clone(),
                    namespace: namespace.clone(),
                })?;

        let host = if self.in_cluster {
            format!(
                "{}.{namespace}.svc.cluster.local",
                internal_service_name(instance_name)
            )
        } else {
            ingress_address(&service)
                .ok_or_else(|| ResolveError::NoIngressAddress { name: svc_name })?
        };

        debug!(
            database = %db.name_any(),
            instance = %instance_name,
            host = %host,
            catalog = %instance.spec.initial_catalog,
            "Resolved connection descriptor"
        );

        Ok(ConnectionInfo {
            host,
            user,
            password,
            catalog: instance.spec.initial_catalog.clone(),
        })
    }
}
