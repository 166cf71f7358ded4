//! Unit tests for admission decisions
//!
//! These tests use the public webhook API (review::decode, DecisionEngine,
//! response::build) to verify policy enforcement from an external perspective.
//!
//! Note: Internal policy tests are in src/webhooks/policies/*.rs

use std::sync::Arc;

use node_selector_webhook::webhooks::response::{self, Outcome};
use node_selector_webhook::webhooks::review::{self, encode};
use node_selector_webhook::webhooks::{
    DecisionEngine, Policy, PolicyRegistry, ResourceKind, ValidationContext, Verdict,
};
use serde_json::json;

use crate::common::*;

fn engine() -> DecisionEngine {
    DecisionEngine::new(Arc::new(PolicyRegistry::with_default_policies()))
}

fn decide(body: &[u8]) -> Verdict {
    let request = review::decode(body).unwrap();
    engine().decide(&request)
}

// =============================================================================
// Default-allow
// =============================================================================

mod default_allow_tests {
    use super::*;

    #[test]
    fn test_service_allowed() {
        assert_eq!(decide(&service_review("svc")), Verdict::allowed());
    }

    #[test]
    fn test_unpoliced_kind_with_unparseable_object_allowed() {
        let body = ReviewBuilder::new("cm", "", "v1", "ConfigMap")
            .with_object(json!("not an object"))
            .to_bytes();
        assert!(decide(&body).allowed);
    }

    #[test]
    fn test_empty_registry_allows_everything() {
        let engine = DecisionEngine::new(Arc::new(PolicyRegistry::new()));
        let request = review::decode(&pod_review("p", Some(json!({})))).unwrap();
        assert!(engine.decide(&request).allowed);
    }

    #[test]
    fn test_statefulset_not_policed() {
        // Only Pods and Deployments are checked, even for workload kinds
        let body = ReviewBuilder::new("sts", "apps", "v1", "StatefulSet")
            .with_object(json!({"apiVersion": "apps/v1", "kind": "StatefulSet"}))
            .to_bytes();
        assert!(decide(&body).allowed);
    }
}

// =============================================================================
// Node selector policy
// =============================================================================

mod node_selector_tests {
    use super::*;

    #[test]
    fn test_pod_with_selector_allowed() {
        let verdict = decide(&pod_review("p", Some(json!({"disk": "ssd"}))));
        assert!(verdict.allowed);
        assert!(verdict.reason.is_none());
    }

    #[test]
    fn test_pod_with_empty_selector_denied() {
        let verdict = decide(&pod_review("p", Some(json!({}))));
        assert_eq!(verdict, Verdict::denied(NODE_SELECTOR_REASON));
    }

    #[test]
    fn test_pod_without_selector_denied() {
        let verdict = decide(&pod_review("p", None));
        assert_eq!(verdict.reason.as_deref(), Some(NODE_SELECTOR_REASON));
    }

    #[test]
    fn test_pod_with_null_selector_denied() {
        let verdict = decide(&pod_review("p", Some(json!(null))));
        assert!(!verdict.allowed);
    }

    #[test]
    fn test_deployment_with_selector_allowed() {
        let verdict = decide(&deployment_review("d", Some(json!({"disk": "ssd"}))));
        assert!(verdict.allowed);
    }

    #[test]
    fn test_deployment_with_empty_selector_denied() {
        let verdict = decide(&deployment_review("d", Some(json!({}))));
        assert_eq!(verdict.reason.as_deref(), Some(NODE_SELECTOR_REASON));
    }

    #[test]
    fn test_deployment_update_policed() {
        let body = ReviewBuilder::new("d", "apps", "v1", "Deployment")
            .with_operation("UPDATE")
            .with_object(deployment_object("api", None))
            .to_bytes();
        assert!(!decide(&body).allowed);
    }

    #[test]
    fn test_pod_delete_not_policed() {
        let body = ReviewBuilder::new("p", "", "v1", "Pod")
            .with_operation("DELETE")
            .to_bytes();
        assert!(decide(&body).allowed);
    }

    #[test]
    fn test_pod_delete_with_empty_selector_allowed() {
        let body = ReviewBuilder::new("p", "", "v1", "Pod")
            .with_operation("DELETE")
            .with_object(pod_object("web", Some(json!({}))))
            .to_bytes();
        assert_eq!(decide(&body), Verdict::allowed());
    }

    #[test]
    fn test_pod_connect_not_policed() {
        let body = ReviewBuilder::new("p", "", "v1", "Pod")
            .with_operation("CONNECT")
            .to_bytes();
        assert!(decide(&body).allowed);
    }
}

// =============================================================================
// Object decode failures
// =============================================================================

mod object_decode_tests {
    use super::*;

    #[test]
    fn test_unparseable_pod_denied_with_cause() {
        let body = ReviewBuilder::new("p", "", "v1", "Pod")
            .with_object(json!({"apiVersion": "v1", "kind": "Pod", "spec": {"containers": 7}}))
            .to_bytes();

        let verdict = decide(&body);
        assert!(!verdict.allowed);
        assert!(
            verdict
                .reason
                .as_deref()
                .unwrap()
                .starts_with("could not parse object: "),
            "reason should explain the parse failure: {:?}",
            verdict.reason
        );
    }

    #[test]
    fn test_deployment_schema_drift_denied() {
        // A valid nodeSelector does not save an object that fails typed decoding
        let mut object = deployment_object("api", Some(json!({"disk": "ssd"})));
        object["spec"]["replicas"] = json!("two");
        let body = ReviewBuilder::new("d", "apps", "v1", "Deployment")
            .with_object(object)
            .to_bytes();

        let verdict = decide(&body);
        assert!(!verdict.allowed);
        assert!(verdict.reason.unwrap().contains("could not parse object"));
    }

    #[test]
    fn test_missing_object_on_create_denied() {
        let body = ReviewBuilder::new("p", "", "v1", "Pod").to_bytes();
        let verdict = decide(&body);
        assert_eq!(
            verdict.reason.as_deref(),
            Some("could not parse object: missing object in request")
        );
    }
}

// =============================================================================
// Custom policies
// =============================================================================

mod registry_tests {
    use super::*;

    /// Denies Pods in the kube-system namespace
    #[derive(Debug)]
    struct NoKubeSystem;

    impl Policy for NoKubeSystem {
        fn name(&self) -> &'static str {
            "no-kube-system"
        }

        fn applies_to(&self, kind: &ResourceKind) -> bool {
            *kind == ResourceKind::Pod
        }

        fn evaluate(&self, ctx: &ValidationContext<'_>) -> Verdict {
            if ctx.namespace == Some("kube-system") {
                Verdict::denied("kube-system is reserved")
            } else {
                Verdict::allowed()
            }
        }
    }

    #[test]
    fn test_policies_evaluated_in_registration_order() {
        let mut registry = PolicyRegistry::new();
        registry
            .register(ResourceKind::Pod, Arc::new(NoKubeSystem))
            .unwrap();
        registry.register_applicable(Arc::new(
            node_selector_webhook::webhooks::policies::RequireNodeSelector,
        ));
        let engine = DecisionEngine::new(Arc::new(registry));

        // Fails both policies; the first registered one reports
        let mut body = ReviewBuilder::new("p", "", "v1", "Pod")
            .with_object(pod_object("web", None))
            .build();
        body["request"]["namespace"] = json!("kube-system");
        let request = review::decode(&serde_json::to_vec(&body).unwrap()).unwrap();
        assert_eq!(
            engine.decide(&request).reason.as_deref(),
            Some("kube-system is reserved")
        );

        // Passes the first, fails the second
        let request = review::decode(&pod_review("p", None)).unwrap();
        assert_eq!(
            engine.decide(&request).reason.as_deref(),
            Some(NODE_SELECTOR_REASON)
        );
    }

    #[test]
    fn test_register_rejects_kind_policy_does_not_cover() {
        let mut registry = PolicyRegistry::new();
        assert!(
            registry
                .register(ResourceKind::Deployment, Arc::new(NoKubeSystem))
                .is_err()
        );
    }
}

// =============================================================================
// Response correlation
// =============================================================================

mod response_tests {
    use super::*;

    #[test]
    fn test_uid_round_trip() {
        for body in [
            pod_review("uid-pod", Some(json!({}))),
            deployment_review("uid-deploy", Some(json!({"disk": "ssd"}))),
            service_review("uid-svc"),
        ] {
            let request = review::decode(&body).unwrap();
            let verdict = engine().decide(&request);
            let reply = response::build(
                request.version,
                Some(&request.uid),
                Outcome::Verdict(&verdict),
            );
            let encoded: serde_json::Value =
                serde_json::from_slice(&encode(&reply).unwrap()).unwrap();
            assert_eq!(encoded["response"]["uid"], json!(request.uid));
            assert_eq!(encoded["apiVersion"], json!("admission.k8s.io/v1"));
        }
    }

    #[test]
    fn test_v1beta1_version_echoed() {
        let body = ReviewBuilder::new("b", "", "v1", "Service")
            .with_api_version("admission.k8s.io/v1beta1")
            .to_bytes();
        let request = review::decode(&body).unwrap();
        let reply = response::build(
            request.version,
            Some(&request.uid),
            Outcome::Verdict(&engine().decide(&request)),
        );
        let encoded: serde_json::Value = serde_json::from_slice(&encode(&reply).unwrap()).unwrap();
        assert_eq!(encoded["apiVersion"], json!("admission.k8s.io/v1beta1"));
    }

    #[test]
    fn test_denied_response_shape() {
        let request = review::decode(&pod_review("shape", Some(json!({})))).unwrap();
        let reply = response::build(
            request.version,
            Some(&request.uid),
            Outcome::Verdict(&engine().decide(&request)),
        );
        let encoded: serde_json::Value = serde_json::from_slice(&encode(&reply).unwrap()).unwrap();
        assert_eq!(
            encoded["response"],
            json!({
                "uid": "shape",
                "allowed": false,
                "status": {"code": 403, "reason": NODE_SELECTOR_REASON}
            })
        );
    }
}
