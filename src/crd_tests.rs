// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `crd`

#[cfg(test)]
mod tests {
    use crate::constants::{API_GROUP, API_VERSION};
    use crate::crd::{
        EngineSpec, PostgresDatabase, PostgresDatabaseSpec, PostgresInstance, PostgresInstanceSpec,
        PrimaryServiceSpec, ServicesSpec,
    };
    use kube::{CustomResourceExt, Resource};

    fn instance_spec() -> PostgresInstanceSpec {
        PostgresInstanceSpec {
            engine: EngineSpec { version: 14 },
            services: ServicesSpec {
                primary: PrimaryServiceSpec {
                    service_type: "LoadBalancer".to_string(),
                },
            },
            credentials: "pg1-secret".to_string(),
            initial_catalog: "appdb".to_string(),
        }
    }

    #[test]
    fn test_instance_crd_metadata() {
        let crd = PostgresInstance::crd();
        assert_eq!(crd.spec.group, API_GROUP);
        assert_eq!(crd.spec.names.kind, "PostgresInstance");
        assert_eq!(crd.spec.names.plural, "postgresinstances");
        assert_eq!(crd.spec.names.short_names, Some(vec!["pgi".to_string()]));
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.versions[0].name, API_VERSION);
    }

    #[test]
    fn test_database_crd_metadata() {
        let crd = PostgresDatabase::crd();
        assert_eq!(crd.spec.group, API_GROUP);
        assert_eq!(crd.spec.names.kind, "PostgresDatabase");
        assert_eq!(crd.spec.names.plural, "postgresdatabases");
        assert_eq!(crd.spec.names.short_names, Some(vec!["pgdb".to_string()]));
    }

    #[test]
    fn test_api_version_strings() {
        assert_eq!(
            PostgresInstance::api_version(&()),
            "postgres.firestoned.io/v1alpha1"
        );
        assert_eq!(
            PostgresDatabase::api_version(&()),
            "postgres.firestoned.io/v1alpha1"
        );
    }

    #[test]
    fn test_instance_spec_serializes_camel_case() {
        let json = serde_json::to_value(instance_spec()).unwrap();

        assert_eq!(json["engine"]["version"], 14);
        assert_eq!(json["services"]["primary"]["type"], "LoadBalancer");
        assert_eq!(json["credentials"], "pg1-secret");
        assert_eq!(json["initialCatalog"], "appdb");
        // The snake_case field name must not leak into the wire format
        assert!(json.get("initial_catalog").is_none());
    }

    #[test]
    fn test_instance_spec_deserializes_from_manifest() {
        let yaml = r"
engine:
  version: 13
services:
  primary:
    type: ClusterIP
credentials: creds
initialCatalog: postgres
";
        let spec: PostgresInstanceSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.engine.version, 13);
        assert_eq!(spec.services.primary.service_type, "ClusterIP");
        assert_eq!(spec.credentials, "creds");
        assert_eq!(spec.initial_catalog, "postgres");
    }

    #[test]
    fn test_database_spec_serializes_camel_case() {
        let spec = PostgresDatabaseSpec {
            instance: "pg1".to_string(),
            db_name: "orders".to_string(),
        };

        let json = serde_json::to_value(spec).unwrap();
        assert_eq!(json["instance"], "pg1");
        assert_eq!(json["dbName"], "orders");
        assert!(json.get("db_name").is_none());
    }

    #[test]
    fn test_database_spec_deserializes_from_manifest() {
        let yaml = r"
instance: pg1
dbName: orders
";
        let spec: PostgresDatabaseSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.instance, "pg1");
        assert_eq!(spec.db_name, "orders");
    }
}
