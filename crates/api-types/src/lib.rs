//! Shared API type definitions
//!
//! This crate contains the `TFJob` custom resource served by the
//! `kubeflow.org/v1alpha2` API group, together with its replica and status
//! types. The resource type is generated by the `kube` derive macro so it
//! plugs directly into `kube::Resource` based tooling.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// API group served by the TFJob operator.
pub const GROUP: &str = "kubeflow.org";
/// The only version of [`GROUP`] this crate knows about.
pub const VERSION: &str = "v1alpha2";
/// Kind of the TFJob resource.
pub const KIND: &str = "TFJob";
/// Plural resource name used in REST paths.
pub const PLURAL: &str = "tfjobs";

/// Desired state of a distributed TensorFlow training job.
#[derive(CustomResource, Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "kubeflow.org",
    version = "v1alpha2",
    kind = "TFJob",
    plural = "tfjobs",
    shortname = "tfjob",
    namespaced,
    status = "TFJobStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct TFJobSpec {
    /// Which pods are removed once the job terminates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_pod_policy: Option<CleanPodPolicy>,
    /// Replica specs keyed by replica role
    #[serde(default)]
    pub tf_replica_specs: BTreeMap<TFReplicaType, TFReplicaSpec>,
}

/// Role of a replica inside a TFJob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub enum TFReplicaType {
    #[serde(rename = "PS")]
    Ps,
    Worker,
    Chief,
    Evaluator,
}

impl std::fmt::Display for TFReplicaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TFReplicaType::Ps => write!(f, "PS"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TFReplicaSpec {
    /// Desired number of replicas, defaults to 1 on the server side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    /// Pod template used for every replica of this role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PodTemplateSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
    /// Restart decided by the exit code of the TensorFlow process
    ExitCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CleanPodPolicy {
    All,
    Running,
    None,
}

/// Observed state of a TFJob.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TFJobStatus {
    #[serde(default)]
    pub conditions: Vec<TFJobCondition>,
    #[serde(default)]
    pub tf_replica_statuses: BTreeMap<TFReplicaType, TFReplicaStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Time>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<Time>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconcile_time: Option<Time>,
}

impl TFJobStatus {
    /// Returns the condition of the given type if the operator reported one.
    pub fn condition(&self, condition_type: TFJobConditionType) -> Option<&TFJobCondition> {
        self.conditions
            .iter()
            .find(|condition| condition.type_ == condition_type)
    }
}

/// Pod counts for one replica role
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TFReplicaStatus {
    #[serde(default)]
    pub active: i32,
    #[serde(default)]
    pub succeeded: i32,
    #[serde(default)]
    pub failed: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TFJobCondition {
    #[serde(rename = "type")]
    pub type_: TFJobConditionType,
    /// One of "True", "False" or "Unknown"
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<Time>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TFJobConditionType {
    Created,
    Running,
    Restarting,
    Succeeded,
    Failed,
}

#[cfg(test)]
mod tests {
    use kube::Resource;
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn resource_constants_match_derived_metadata() {
        assert_eq!(TFJob::group(&()).as_ref(), GROUP);
        assert_eq!(TFJob::version(&()).as_ref(), VERSION);
        assert_eq!(TFJob::kind(&()).as_ref(), KIND);
        assert_eq!(TFJob::plural(&()).as_ref(), PLURAL);
        assert_eq!(TFJob::api_version(&()).as_ref(), "kubeflow.org/v1alpha2");
    }

    #[test]
    fn deserialize_job_with_replicas_and_status() {
        let job: TFJob = serde_json::from_value(json!({
            "apiVersion": "kubeflow.org/v1alpha2",
            "kind": "TFJob",
            "metadata": { "name": "mnist", "namespace": "team-a" },
            "spec": {
                "cleanPodPolicy": "Running",
                "tfReplicaSpecs": {
                    "PS": { "replicas": 1, "restartPolicy": "Never" },
                    "Worker": { "replicas": 4, "restartPolicy": "ExitCode" }
                }
            },
            "status": {
                "conditions": [
                    { "type": "Running", "status": "True", "reason": "TFJobRunning" }
                ],
                "tfReplicaStatuses": { "Worker": { "active": 4 } }
            }
        }))
        .expect("should deserialize TFJob");

        assert_eq!(job.metadata.name.as_deref(), Some("mnist"));
        assert_eq!(job.spec.clean_pod_policy, Some(CleanPodPolicy::Running));
        let ps = &job.spec.tf_replica_specs[&TFReplicaType::Ps];
        assert_eq!(ps.replicas, Some(1));
        assert_eq!(ps.restart_policy, Some(RestartPolicy::Never));
        assert_eq!(
            job.spec.tf_replica_specs[&TFReplicaType::Worker].restart_policy,
            Some(RestartPolicy::ExitCode)
        );

        let status = job.status.expect("status should be present");
        assert_eq!(status.tf_replica_statuses[&TFReplicaType::Worker].active, 4);
        let running = status
            .condition(TFJobConditionType::Running)
            .expect("running condition");
        assert_eq!(running.status.as_str(), "True");
        assert!(status.condition(TFJobConditionType::Failed).is_none());
    }

    #[test]
    fn serialize_stamps_type_metadata() {
        let mut spec = TFJobSpec::default();
        spec.tf_replica_specs.insert(TFReplicaType::Chief, TFReplicaSpec {
            replicas: Some(1),
            ..Default::default()
        });
        let job = TFJob::new("dist-mnist", spec);

        let value = serde_json::to_value(&job).expect("should serialize TFJob");
        assert_eq!(value["apiVersion"], json!("kubeflow.org/v1alpha2"));
        assert_eq!(value["kind"], json!("TFJob"));
        assert_eq!(value["spec"]["tfReplicaSpecs"]["Chief"]["replicas"], json!(1));
        assert!(value["spec"].get("cleanPodPolicy").is_none());
    }

    #[test]
    fn replica_type_display_uses_wire_names() {
        assert_eq!(TFReplicaType::Ps.to_string().as_str(), "PS");
        assert_eq!(TFReplicaType::Evaluator.to_string().as_str(), "Evaluator");
    }
}
