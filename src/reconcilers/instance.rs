// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! PostgreSQL instance reconciliation logic.
//!
//! This module handles the lifecycle of engine deployments in Kubernetes:
//! one Deployment and two Services per `PostgresInstance`, created on the
//! Added event and destroyed on the Deleted event. The instance spec is
//! treated as immutable after creation: Updated is deliberately a no-op,
//! and the sweep hook only reports what is tracked.

use crate::constants::{SECRET_KEY_PASSWORD, SECRET_KEY_USER_ID, SERVICE_TYPE_CLUSTER_IP};
use crate::crd::PostgresInstance;
use crate::handler::{OperationHandler, Outcome};
use crate::pg_resources::{
    build_deployment, build_service, deployment_name, external_service_name, internal_service_name,
};
use crate::resolver::decode_secret_key;
use crate::state::{object_id, Store};
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{Secret, Service},
};
use kube::{
    api::{DeleteParams, PostParams},
    Api, Client, ResourceExt,
};
use tracing::{error, info, warn};

/// Reconciles `PostgresInstance` resources against the cluster.
///
/// Holds the kind's tracking [`Store`] and the cluster client; every entry
/// point takes the store lock for its full duration, serializing all
/// instance operations against each other and against the sweep.
pub struct InstanceHandler {
    client: Client,
    store: Store<PostgresInstance>,
}

impl InstanceHandler {
    /// Create a handler over an injected tracking store.
    #[must_use]
    pub fn new(client: Client, store: Store<PostgresInstance>) -> Self {
        Self { client, store }
    }

    /// The tracked-instance store shared with the dispatcher and the
    /// database resolver.
    #[must_use]
    pub fn store(&self) -> &Store<PostgresInstance> {
        &self.store
    }

    /// Idempotency pre-check: does any of the three provisioned objects
    /// already exist?
    async fn any_object_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        let deploy_api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        if deploy_api.get_opt(&deployment_name(name)).await?.is_some() {
            info!("Deployment {} exists", deployment_name(name));
            return Ok(true);
        }

        let svc_api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        for svc_name in [internal_service_name(name), external_service_name(name)] {
            if svc_api.get_opt(&svc_name).await?.is_some() {
                info!("Service {svc_name} exists");
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Verify the referenced credentials Secret exists and carries both
    /// required keys, failing fast with a descriptive error otherwise.
    async fn verify_credentials_secret(&self, namespace: &str, secret_name: &str) -> Result<()> {
        let secret_api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = secret_api
            .get_opt(secret_name)
            .await?
            .with_context(|| format!("Secret '{secret_name}' not found in namespace {namespace}"))?;

        for key in [SECRET_KEY_USER_ID, SECRET_KEY_PASSWORD] {
            decode_secret_key(&secret, key)?;
            info!("Found key: {key}");
        }

        Ok(())
    }

    /// Delete one provisioned object, tolerating "does not exist".
    async fn delete_object<K>(&self, api: &Api<K>, name: &str) -> Result<()>
    where
        K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
    {
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => info!("Deleted {name}"),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                info!("{name} already gone");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

#[async_trait]
impl OperationHandler for InstanceHandler {
    type Resource = PostgresInstance;

    async fn on_added(&self, instance: PostgresInstance) -> Result<Outcome> {
        let mut tracked = self.store.lock().await;

        let namespace = instance.namespace().unwrap_or_default();
        let name = instance.name_any();
        info!("PostgresInstance {namespace}/{name} was ADDED");
        info!(
            version = instance.spec.engine.version,
            service_type = %instance.spec.services.primary.service_type,
            credentials = %instance.spec.credentials,
            initial_catalog = %instance.spec.initial_catalog,
            "Instance spec"
        );

        // Idempotency: if any provisioned object already exists, treat the
        // instance as already provisioned and do not record tracking.
        if self.any_object_exists(&namespace, &name).await? {
            warn!("PostgresInstance {namespace}/{name} is already provisioned, skipping");
            return Ok(Outcome::AlreadySatisfied);
        }

        self.verify_credentials_secret(&namespace, &instance.spec.credentials)
            .await?;

        info!("Creating Deployment {}", deployment_name(&name));
        let deployment = build_deployment(&instance);
        let deploy_api: Api<Deployment> = Api::namespaced(self.client.clone(), &namespace);
        deploy_api
            .create(&PostParams::default(), &deployment)
            .await?;

        info!("Creating Services for PostgresInstance {namespace}/{name}");
        let svc_api: Api<Service> = Api::namespaced(self.client.clone(), &namespace);
        let external = build_service(
            &instance,
            &instance.spec.services.primary.service_type,
            &external_service_name(&name),
        );
        svc_api.create(&PostParams::default(), &external).await?;
        let internal = build_service(
            &instance,
            SERVICE_TYPE_CLUSTER_IP,
            &internal_service_name(&name),
        );
        svc_api.create(&PostParams::default(), &internal).await?;

        tracked.insert(object_id(&namespace, &name), instance);
        info!("PostgresInstance {namespace}/{name} was CREATED");

        Ok(Outcome::Applied)
    }

    async fn on_updated(&self, instance: PostgresInstance) -> Result<Outcome> {
        let mut tracked = self.store.lock().await;

        let namespace = instance.namespace().unwrap_or_default();
        let name = instance.name_any();

        // Spec drift in an existing instance is not reconciled into the live
        // deployment; the accepted resource is still recorded so the tracked
        // set reflects the latest object.
        info!("PostgresInstance {namespace}/{name} was updated; live objects are left as-is");
        tracked.insert(object_id(&namespace, &name), instance);

        Ok(Outcome::AlreadySatisfied)
    }

    async fn on_deleted(&self, instance: PostgresInstance) -> Result<Outcome> {
        let mut tracked = self.store.lock().await;

        let namespace = instance.namespace().unwrap_or_default();
        let name = instance.name_any();
        info!("PostgresInstance {namespace}/{name} must be DELETED");

        let deploy_api: Api<Deployment> = Api::namespaced(self.client.clone(), &namespace);
        self.delete_object(&deploy_api, &deployment_name(&name))
            .await?;

        let svc_api: Api<Service> = Api::namespaced(self.client.clone(), &namespace);
        self.delete_object(&svc_api, &internal_service_name(&name))
            .await?;
        self.delete_object(&svc_api, &external_service_name(&name))
            .await?;

        tracked.remove(&object_id(&namespace, &name));
        info!("PostgresInstance {namespace}/{name} was DELETED");

        Ok(Outcome::Applied)
    }

    async fn on_bookmarked(&self, instance: PostgresInstance) -> Result<()> {
        warn!("PostgresInstance {} was BOOKMARKED", instance.name_any());
        Ok(())
    }

    async fn on_error(&self, instance: PostgresInstance) -> Result<()> {
        error!("ERROR on PostgresInstance {}", instance.name_any());
        Ok(())
    }

    /// Sweep hook. Instance health is not actively verified (only
    /// database-kind drift is repaired), so this only reports the tracked
    /// set.
    async fn check_current_state(&self) -> Result<()> {
        let tracked = self.store.lock().await;
        for (id, _) in tracked.iter() {
            info!("Checking PostgresInstance {id}");
        }
        Ok(())
    }
}
