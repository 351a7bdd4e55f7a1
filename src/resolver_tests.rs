// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `resolver`

#[cfg(test)]
mod tests {
    use crate::resolver::{decode_secret_key, ingress_address, ResolveError};
    use k8s_openapi::api::core::v1::{
        LoadBalancerIngress, LoadBalancerStatus, Secret, Service, ServiceStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn create_test_secret(entries: &[(&str, &[u8])]) -> Secret {
        let mut data = BTreeMap::new();
        for (key, value) in entries {
            data.insert((*key).to_string(), ByteString(value.to_vec()));
        }
        Secret {
            metadata: ObjectMeta {
                name: Some("pg1-secret".into()),
                namespace: Some("test-ns".into()),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        }
    }

    fn create_test_service(ingress: Vec<LoadBalancerIngress>) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some("pg1-external-svc".into()),
                ..Default::default()
            },
            status: Some(ServiceStatus {
                load_balancer: Some(LoadBalancerStatus {
                    ingress: Some(ingress),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_secret_key() {
        let secret = create_test_secret(&[
            ("userid", b"admin".as_slice()),
            ("password", b"hunter2".as_slice()),
        ]);
        assert_eq!(decode_secret_key(&secret, "userid").unwrap(), "admin");
        assert_eq!(decode_secret_key(&secret, "password").unwrap(), "hunter2");
    }

    #[test]
    fn test_decode_secret_key_missing() {
        let secret = create_test_secret(&[("userid", b"admin".as_slice())]);
        let err = decode_secret_key(&secret, "password").unwrap_err();
        match err {
            ResolveError::MissingSecretKey { secret, key } => {
                assert_eq!(secret, "pg1-secret");
                assert_eq!(key, "password");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_secret_key_no_data() {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some("empty".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            decode_secret_key(&secret, "userid"),
            Err(ResolveError::MissingSecretKey { .. })
        ));
    }

    #[test]
    fn test_decode_secret_key_invalid_utf8() {
        let secret = create_test_secret(&[("userid", &[0xff, 0xfe][..])]);
        assert!(matches!(
            decode_secret_key(&secret, "userid"),
            Err(ResolveError::InvalidSecretText { .. })
        ));
    }

    #[test]
    fn test_ingress_address_prefers_ip() {
        let service = create_test_service(vec![LoadBalancerIngress {
            ip: Some("203.0.113.10".into()),
            hostname: Some("lb.example.com".into()),
            ..Default::default()
        }]);
        assert_eq!(ingress_address(&service).as_deref(), Some("203.0.113.10"));
    }

    #[test]
    fn test_ingress_address_falls_back_to_hostname() {
        let service = create_test_service(vec![LoadBalancerIngress {
            ip: None,
            hostname: Some("lb.example.com".into()),
            ..Default::default()
        }]);
        assert_eq!(ingress_address(&service).as_deref(), Some("lb.example.com"));
    }

    #[test]
    fn test_ingress_address_first_entry_wins() {
        let service = create_test_service(vec![
            LoadBalancerIngress {
                ip: Some("203.0.113.10".into()),
                ..Default::default()
            },
            LoadBalancerIngress {
                ip: Some("203.0.113.11".into()),
                ..Default::default()
            },
        ]);
        assert_eq!(ingress_address(&service).as_deref(), Some("203.0.113.10"));
    }

    #[test]
    fn test_ingress_address_none_when_unassigned() {
        let service = create_test_service(vec![]);
        assert!(ingress_address(&service).is_none());

        let no_status = Service::default();
        assert!(ingress_address(&no_status).is_none());
    }

    #[test]
    fn test_resolve_error_messages() {
        let err = ResolveError::InstanceNotFound {
            name: "pg1".into(),
            namespace: "test-ns".into(),
        };
        assert_eq!(
            err.to_string(),
            "PostgresInstance 'pg1' not found in namespace test-ns"
        );

        let err = ResolveError::NoIngressAddress {
            name: "pg1-external-svc".into(),
        };
        assert!(err.to_string().contains("pg1-external-svc"));
    }
}
